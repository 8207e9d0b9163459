//! Logging facilities.
//!
//! All messages carry the current simulated time and the name of the
//! component which produced them.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Logs a message at the info level.
#[macro_export]
macro_rules! log_info {
    ($time:expr, $comp:expr, $msg:expr) => (
        log::info!(
            target: $comp,
            "[{:.3} {}  {}] {}",
            $time, $crate::log::get_colored("INFO", $crate::colored::Color::Green), $comp, $msg
        )
    );
    ($time:expr, $comp:expr, $format:expr, $($arg:tt)+) => (
        log::info!(
            target: $comp,
            concat!("[{:.3} {}  {}] ", $format),
            $time, $crate::log::get_colored("INFO", $crate::colored::Color::Green), $comp, $($arg)+
        )
    );
}

/// Logs a message at the debug level.
#[macro_export]
macro_rules! log_debug {
    ($time:expr, $comp:expr, $msg:expr) => (
        log::debug!(
            target: $comp,
            "[{:.3} {} {}] {}",
            $time, $crate::log::get_colored("DEBUG", $crate::colored::Color::Blue), $comp, $msg
        )
    );
    ($time:expr, $comp:expr, $format:expr, $($arg:tt)+) => (
        log::debug!(
            target: $comp,
            concat!("[{:.3} {} {}] ", $format),
            $time, $crate::log::get_colored("DEBUG", $crate::colored::Color::Blue), $comp, $($arg)+
        )
    );
}

/// Logs a message at the trace level.
#[macro_export]
macro_rules! log_trace {
    ($time:expr, $comp:expr, $msg:expr) => (
        log::trace!(
            target: $comp,
            "[{:.3} {} {}] {}",
            $time, $crate::log::get_colored("TRACE", $crate::colored::Color::Cyan), $comp, $msg
        )
    );
    ($time:expr, $comp:expr, $format:expr, $($arg:tt)+) => (
        log::trace!(
            target: $comp,
            concat!("[{:.3} {} {}] ", $format),
            $time, $crate::log::get_colored("TRACE", $crate::colored::Color::Cyan), $comp, $($arg)+
        )
    );
}

/// Logs a message at the warn level.
#[macro_export]
macro_rules! log_warn {
    ($time:expr, $comp:expr, $msg:expr) => (
        log::warn!(
            target: $comp,
            "[{:.3} {}  {}] {}",
            $time, $crate::log::get_colored("WARN", $crate::colored::Color::Yellow), $comp, $msg
        )
    );
    ($time:expr, $comp:expr, $format:expr, $($arg:tt)+) => (
        log::warn!(
            target: $comp,
            concat!("[{:.3} {}  {}] ", $format),
            $time, $crate::log::get_colored("WARN", $crate::colored::Color::Yellow), $comp, $($arg)+
        )
    );
}

/// Logs a message at the error level.
#[macro_export]
macro_rules! log_error {
    ($time:expr, $comp:expr, $msg:expr) => (
        log::error!(
            target: $comp,
            "[{:.3} {} {}] {}",
            $time, $crate::log::get_colored("ERROR", $crate::colored::Color::Red), $comp, $msg
        )
    );
    ($time:expr, $comp:expr, $format:expr, $($arg:tt)+) => (
        log::error!(
            target: $comp,
            concat!("[{:.3} {} {}] ", $format),
            $time, $crate::log::get_colored("ERROR", $crate::colored::Color::Red), $comp, $($arg)+
        )
    );
}

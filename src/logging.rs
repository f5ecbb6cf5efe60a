//! Internal logging shims. Events reach `log` only when the `logging` feature is enabled,
//! otherwise the statements are compiled out together with their arguments.

#![allow(unused_macros)]

macro_rules! log_event {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "logging")]
        log::$level!(target: "dynarray", $($arg)+);
    };
}

macro_rules! debug {
    ($($arg:tt)+) => {
        log_event!(debug, $($arg)+)
    };
}

macro_rules! trace {
    ($($arg:tt)+) => {
        log_event!(trace, $($arg)+)
    };
}

/// Element type name used in log lines.
#[cfg(feature = "logging")]
pub(crate) fn element_name<T>() -> &'static str {
    std::any::type_name::<T>()
}

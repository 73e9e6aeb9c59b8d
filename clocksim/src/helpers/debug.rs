// Machine-scoped debugger
#[macro_export]
macro_rules! debug_machine {
    ($tick:expr, $port:expr, $($arg:tt)+) => {
        log::debug!("[Tick: {} | M{}] {}", $tick, $port, format_args!($($arg)+));
    }
}

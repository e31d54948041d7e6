pub use colored::Colorize;

// Colors go through `colored`, so NO_COLOR and CLICOLOR are honored.

#[macro_export]
macro_rules! print_green {
    ($($arg:tt)*) => {
        println!("{}", $crate::common::logging::Colorize::green(format!($($arg)*).as_str()));
    };
}

#[macro_export]
macro_rules! print_yellow {
    ($($arg:tt)*) => {
        println!("{}", $crate::common::logging::Colorize::yellow(format!($($arg)*).as_str()));
    };
}

#[macro_export]
macro_rules! print_blue {
    ($($arg:tt)*) => {
        println!("{}", $crate::common::logging::Colorize::blue(format!($($arg)*).as_str()));
    };
}

/// Section divider printed between node marginals
#[macro_export]
macro_rules! print_divider {
    () => {
        println!("----------------");
    };
}

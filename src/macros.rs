#[macro_export]
macro_rules! accept_field {
    ($sen:expr, $idx:expr) => {
        match $sen.field($idx) {
            Some(f) if !f.is_empty() => Some(f),
            _ => None,
        }
    };
}

#[macro_export]
macro_rules! expect_field {
    ($sen:expr, $idx:expr, $name:expr) => {
        match accept_field!($sen, $idx) {
            Some(f) => f,
            None => return Err(FixError::NoSignal($name)),
        }
    };
}

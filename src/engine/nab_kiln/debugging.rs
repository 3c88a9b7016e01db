#[macro_export]
macro_rules! debug_panic
{
    ($($arg:tt)*) =>
    {
        if cfg!(debug_assertions)
        {
            panic!($($arg)*)
        }
    }
}

// Safe to call more than once; later calls are no-ops (handy in tests)
pub fn init_logging()
{
    let _ = colog::default_builder()
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

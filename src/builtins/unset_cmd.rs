//! `unset NAME...` — deletes one or more environment variables.

pub fn run(args: &[String]) -> i32 {
    for name in args {
        std::env::remove_var(name);
    }
    0
}

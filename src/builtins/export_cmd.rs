//! `export NAME=VALUE | NAME` — sets a process environment variable.

pub fn run(args: &[String]) -> i32 {
    let mut status = 0;
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => std::env::set_var(name, value),
            None => {
                // `export NAME` with no `=value` exports the variable's
                // current value unchanged; if it's unset there's nothing
                // to do (bash would mark it for export without a value —
                // out of scope here since we have no shell-local variable
                // table distinct from the process environment).
                if std::env::var(arg).is_err() {
                    status = 1;
                }
            }
        }
    }
    status
}

//! `cd [DIR]` — changes the shell's working directory. No argument means
//! `$HOME`; a missing `$HOME` is an error.

pub fn run(args: &[String]) -> i32 {
    let target = match args.first() {
        Some(dir) => dir.clone(),
        None => match std::env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                eprintln!("myshell: cd: HOME not set");
                return 1;
            }
        },
    };

    match std::env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("myshell: cd: {target}: {e}");
            1
        }
    }
}

use std::cell::RefCell;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

use ansi_term::Color;
use fern::{Dispatch, FormatCallback};
use lazy_static::lazy_static;
use log::{Level, LevelFilter, SetLoggerError};

thread_local! {
    static GLOBAL_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

lazy_static! {
    static ref OUTPUT_MUTEX: Mutex<()> = Mutex::new(());
}

/// Prefixes log messages of the current thread with `[name] ` while alive.
pub struct GlobalContext {
}

impl GlobalContext {
    pub fn new(name: &str) -> GlobalContext {
        let context_string = format!("[{}] ", name);

        GLOBAL_CONTEXT.with_borrow_mut(|context| {
            if context.is_some() {
                panic!("An attempt to set a nested global context.");
            }
            *context = Some(context_string);
        });

        GlobalContext{}
    }

    fn get() -> String {
        GLOBAL_CONTEXT.with_borrow(|context| context.clone().unwrap_or_default())
    }
}

impl Drop for GlobalContext {
    fn drop(&mut self) {
        GLOBAL_CONTEXT.with_borrow_mut(|context| *context = None);
    }
}

// Standard output is reserved for command results, so all messages go to stderr.
pub fn init(level: Level) -> Result<(), SetLoggerError> {
    let debug_mode = level >= Level::Debug;

    configure_formatter(Dispatch::new(), debug_mode, io::stderr().is_terminal())
        .level(if debug_mode {
            LevelFilter::Warn
        } else {
            LevelFilter::Off
        })
        .level_for(module_path!().split("::").next().unwrap_or("dvm"), level.to_level_filter())
        .chain(io::stderr())
        .apply()
}

fn configure_formatter(dispatcher: Dispatch, debug_mode: bool, colored_output: bool) -> Dispatch {
    if debug_mode {
        dispatcher.format(move |out, message, record| {
            let line = record.line().unwrap_or(0);
            let level = record.level();

            let mut file_width = 10;
            let mut line_width = 3;
            let mut line_extra_width = line / 1000;

            while line_extra_width > 0 && file_width > 0 {
                line_width += 1;
                file_width -= 1;
                line_extra_width /= 10;
            }

            let mut file = record.file().unwrap_or("");
            if let Some(stripped) = file.strip_prefix("src/") {
                file = stripped;
            }
            if file.len() > file_width {
                file = &file[file.len() - file_width..]
            }

            let level_name = get_level_name(level);
            let time = chrono::Local::now().format("[%T%.3f]");

            if colored_output {
                let level_color = get_level_color(level);
                write_log(out, format_args!(
                    "{color_prefix}{time} [{file:>file_width$}:{line:0line_width$}] {level}: {context}{message}{color_suffix}",
                    color_prefix=level_color.prefix(), time=time, file=file, file_width=file_width,
                    line=line, line_width=line_width, level=level_name,
                    context=GlobalContext::get(), message=message, color_suffix=level_color.suffix()
                ));
            } else {
                write_log(out, format_args!(
                    "{time} [{file:>file_width$}:{line:0line_width$}] {level}: {context}{message}",
                    time=time, file=file, file_width=file_width, line=line, line_width=line_width,
                    level=level_name, context=GlobalContext::get(), message=message
                ));
            }
        })
    } else {
        dispatcher.format(move |out, message, record| {
            let level = record.level();
            let level_name = get_level_name(level);

            if colored_output {
                let level_color = get_level_color(level);
                write_log(out, format_args!(
                    "{color_prefix}{level}: {context}{message}{color_suffix}",
                    color_prefix=level_color.prefix(), level=level_name,
                    context=GlobalContext::get(), message=message, color_suffix=level_color.suffix()
                ));
            } else {
                write_log(out, format_args!("{level}: {context}{message}",
                    level=level_name, context=GlobalContext::get(), message=message));
            }
        })
    }
}

fn get_level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn  => Color::Yellow,
        Level::Info  => Color::Green,
        Level::Debug => Color::Cyan,
        Level::Trace => Color::Purple,
    }
}

fn get_level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "E",
        Level::Warn  => "W",
        Level::Info  => "I",
        Level::Debug => "D",
        Level::Trace => "T",
    }
}

fn write_log(out: FormatCallback, formatted_message: fmt::Arguments) {
    // reqwest may log from its own runtime thread
    let _lock = OUTPUT_MUTEX.lock();

    out.finish(formatted_message);
    let _ = io::stderr().flush();
}

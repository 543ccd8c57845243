use std::io::Write;

use anstyle::{AnsiColor, Color, RgbColor, Style};

/// logger 的可选项
#[derive(Clone, Copy, Debug)]
pub struct LogOptions {
    /// 没有设置 `RUST_LOG` 时的过滤级别
    pub default_level: log::LevelFilter,
    /// 是否输出 `[file:line]`
    pub show_location: bool,
}
impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_level: log::LevelFilter::Info,
            show_location: true,
        }
    }
}

/// 初始化全局 logger，使用默认选项
pub fn init_log() {
    init_log_with(LogOptions::default());
}

/// 初始化全局 logger
///
/// 每一行的格式为 `[时间] 级别 [crate] [file:line] 消息`，其中 `prism_xxx` crate 缩写为 `xxx`。
/// `RUST_LOG` 会覆盖 `default_level`，重复调用时直接忽略。
pub fn init_log_with(options: LogOptions) {
    let result = env_logger::Builder::new()
        .format(move |buf, record| {
            let level_style = level_style(record.level());
            let tag_style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
            let grey_style = Style::new().fg_color(Some(Color::Rgb(RgbColor(110, 110, 110))));

            let time = chrono::Local::now().format("%H:%M:%S%.3f");
            let level = record.level();
            let tag = crate_tag(record.module_path().unwrap_or(record.target()));

            write!(buf, "{level_style}[{time}] {level:<5}{level_style:#} {tag_style}[{tag}]{tag_style:#} ")?;
            if options.show_location {
                let file = short_file_name(record.file().unwrap_or(""));
                let line = record.line().unwrap_or(0);
                write!(buf, "{grey_style}[{file}:{line}]{grey_style:#} ")?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter(None, options.default_level)
        .parse_default_env()
        .try_init();

    if result.is_err() {
        log::debug!("logger already initialized");
    }
}

/// 测试用的 logger，输出交给 test harness 捕获
pub fn init_test_log() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();
}

// tools
fn level_style(level: log::Level) -> Style {
    let color = match level {
        log::Level::Error => AnsiColor::Red,
        log::Level::Warn => AnsiColor::Yellow,
        log::Level::Info => AnsiColor::Green,
        log::Level::Debug => AnsiColor::Blue,
        log::Level::Trace => AnsiColor::Magenta,
    };
    let style = Style::new().fg_color(Some(Color::Ansi(color)));
    if level <= log::Level::Warn { style.bold() } else { style }
}

/// `prism_render_graph::render_graph` -> `render_graph`，其它 crate 保留完整的 crate 名
fn crate_tag(module_path: &str) -> &str {
    let krate = module_path.split("::").next().unwrap_or(module_path);
    krate.strip_prefix("prism_").unwrap_or(krate)
}

/// 兼容 `/` 和 `\` 两种分隔符
fn short_file_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{never, select, unbounded, Receiver};

use find_extension::presentation::print_failure;
use find_extension::{
    print_summary, Config, LogConsole, Logger, LoggerTrait, SearchConfig, SearchController,
    SearchEvent,
};

/// 按扩展名递归查找文件，并把路径写入结果文件
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// 要搜索的目录路径
    #[clap(required = true)]
    path: PathBuf,

    /// 文件扩展名 (例如 jpg, .avi, TXT)
    #[clap(required = true)]
    extension: String,

    /// 结果文件所在目录，默认取配置文件中的值
    #[clap(short, long)]
    output_dir: Option<PathBuf>,

    /// 结果文件名 (不含 .txt)，默认取配置文件中的值
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// 配置文件路径，默认在程序同级目录下
    #[clap(long)]
    config: Option<PathBuf>,

    /// 启用调试日志记录
    #[clap(long)]
    log: bool,

    /// 不打印每条日志，只显示进度和摘要
    #[clap(short, long)]
    quiet: bool,
}

/// 读取标准输入，输入 q 后请求取消
fn spawn_cancel_listener() -> Receiver<()> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                let _ = tx.send(());
                break;
            }
        }
    });
    rx
}

fn run(args: Args) -> Result<bool> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = Config::load_or_create(&config_path)?;
    config
        .validate()
        .with_context(|| format!("配置文件无效: {}", config_path.display()))?;

    let logger = Arc::new(Logger::new(
        args.log || config.logging.debug_log,
        &PathBuf::from(&config.logging.log_dir),
    )?);
    if logger.is_enabled() {
        println!("调试日志: {}", logger.log_path().display());
    }

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&config.output.default_dir));
    let name = args
        .name
        .unwrap_or_else(|| config.output.default_base_name.clone());
    let search = SearchConfig::new(&args.path, &args.extension, output_dir, &name);

    let mut controller = SearchController::new(&config, logger.clone());
    let events = controller.events();
    let handle = controller.start(search).context("无法启动搜索")?;

    println!("输入 q 并回车可取消搜索");
    let cancel_rx = spawn_cancel_listener();
    let stdin_closed_rx = never();
    let mut stdin_closed = false;
    let mut console = LogConsole::new(!args.quiet)?;

    let succeeded = loop {
        select! {
            recv(events.receiver()) -> event => {
                let event = match event {
                    Ok(event) => event,
                    Err(_) => break false,
                };
                if event.run_id() != handle.run_id() {
                    continue;
                }
                match event {
                    SearchEvent::Log(log) => {
                        if !args.quiet {
                            console.print_log(&log)?;
                        }
                    }
                    SearchEvent::Completed { summary, .. } => {
                        console.finish();
                        print_summary("搜索摘要", &summary)?;
                        break true;
                    }
                    SearchEvent::Cancelled { summary, .. } => {
                        console.finish();
                        print_summary("搜索已取消", &summary)?;
                        break false;
                    }
                    SearchEvent::Failed { kind, message, .. } => {
                        console.finish();
                        print_failure(kind, &message);
                        break false;
                    }
                }
            }
            recv(if stdin_closed { &stdin_closed_rx } else { &cancel_rx }) -> msg => {
                match msg {
                    Ok(()) => {
                        controller.cancel(&handle);
                    }
                    // 标准输入已关闭，之后不再监听
                    Err(_) => stdin_closed = true,
                }
            }
        }
    };

    controller.wait();
    Ok(succeeded)
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("错误: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

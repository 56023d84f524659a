use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warelytic::config::{default_config_path, load_config, save_config};
use warelytic::models::{AppConfig, OutputMode, RunOptions, SummaryReport};
use warelytic::target_date::resolve_target_date;
use warelytic::{merge_exports, summarize_merged};

/// 合并仓库每日 Excel 导出并生成 KPI 汇总
#[derive(Parser, Debug)]
#[command(name = "warelytic", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 配置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别 (error, warn, info, debug)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 合并每个子文件夹的三个导出文件
    Merge(RunArgs),
    /// 从合并文件提取 KPI 并写入汇总 CSV
    Summarize(RunArgs),
    /// 先合并再汇总
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// 目标日期 YYYY-MM-DD
    #[arg(conflicts_with_all = ["yesterday", "date"])]
    positional_date: Option<String>,

    /// 使用昨天作为日期
    #[arg(long, conflicts_with = "date")]
    yesterday: bool,

    /// 使用指定日期 YYYY-MM-DD
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<String>,

    /// 删除非目标日期或无关键词的文件
    #[arg(long)]
    delete_others: bool,

    /// 仓库子文件夹所在目录
    #[arg(long)]
    parent_dir: Option<String>,

    /// 输出到统一目录而不是原文件夹
    #[arg(long)]
    unified_output: bool,

    /// 保存本次生效的配置
    #[arg(long)]
    save_config: bool,
}

fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn effective_config(cli_config: Option<&PathBuf>, args: &RunArgs) -> Result<AppConfig> {
    let config_path = cli_config.cloned().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);

    if let Some(parent_dir) = &args.parent_dir {
        config.parent_dir = parent_dir.clone();
    }
    if args.unified_output {
        config.output_mode = OutputMode::Unified;
    }

    if args.save_config {
        save_config(&config, &config_path)
            .with_context(|| format!("保存配置失败: {}", config_path.display()))?;
        info!("配置已保存 Config saved: {}", config_path.display());
    }

    Ok(config)
}

fn run_options(args: &RunArgs) -> Result<RunOptions> {
    let target_date = resolve_target_date(
        Local::now().date_naive(),
        args.yesterday,
        args.positional_date.as_deref(),
        args.date.as_deref(),
    )?;

    Ok(RunOptions {
        target_date,
        delete_others: args.delete_others,
    })
}

fn print_summary(report: &SummaryReport) {
    let fmt_count = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    let fmt_num = |v: Option<f64>| v.map(|n| format!("{:.0}", n)).unwrap_or_else(|| "-".to_string());

    for r in &report.records {
        info!(
            "{} | inv_sku={} inv_qty={} volume_m3={} | ib_order={} ib_sku={} ib_qty={} | ob_order={} ob_qty={}",
            r.warehouse,
            fmt_count(r.inv_sku),
            fmt_num(r.inv_qty),
            r.inv_total_volume_m3
                .map(|v| format!("{:.3}", v))
                .unwrap_or_else(|| "-".to_string()),
            fmt_count(r.ib_order),
            fmt_count(r.ib_sku),
            fmt_num(r.ib_qty),
            fmt_count(r.ob_order),
            fmt_num(r.ob_qty),
        );
    }
    if report.failed > 0 {
        info!("处理失败 Failed workbooks: {}", report.failed);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let args = match &cli.command {
        Command::Merge(args) | Command::Summarize(args) | Command::Run(args) => args,
    };
    let config = effective_config(cli.config.as_ref(), args)?;
    let options = run_options(args)?;

    info!("warelytic v{} starting", env!("CARGO_PKG_VERSION"));

    if matches!(cli.command, Command::Merge(_) | Command::Run(_)) {
        merge_exports(&config, &options).context("合并失败 Merge run failed")?;
    }
    if matches!(cli.command, Command::Summarize(_) | Command::Run(_)) {
        let report = summarize_merged(&config, &options).context("汇总失败 Summary run failed")?;
        print_summary(&report);
    }

    Ok(())
}

//! NSS 캐시 데몬 CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nss_core::{init_logging, LogConfig, LogFormat};
use nss_daemon::{
    config::DEFAULT_CONFIG_PATH, os_shutdown_signal, run_daemon, DaemonConfig, DaemonOptions,
    Manager,
};

#[derive(Parser)]
#[command(name = "nss-cache")]
#[command(about = "Keeps NSS cache files in sync with a remote account source", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 설정 파일 경로
    #[arg(long, env = "NSS_CACHE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error). RUST_LOG가 있으면 무시됨
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// 데몬 모드: 워커를 시작하고 종료 신호를 기다림 (기본값)
    Daemon,

    /// 모든 계정 유형을 한 번씩 동기화하고 종료
    SyncOnce,

    /// 설정을 검증하고 적용된 값을 출력
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(&LogConfig::new(&cli.log_level).with_format(cli.log_format))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    // 설정 로드 (실패 시 시작하지 않음)
    let config = DaemonConfig::load(&cli.config)
        .with_context(|| format!("설정 파일 로드 실패: {}", cli.config.display()))?;
    tracing::debug!(config = ?config, "설정 로드 완료");

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::SyncOnce => {
            let manager = Manager::from_config(&config)?;
            let results = manager.run_once().await;

            print!("{}", manager.status_report().await);

            let failed: Vec<&str> = results
                .iter()
                .filter(|(_, result)| result.is_err())
                .map(|(kind, _)| kind.name())
                .collect();
            if !failed.is_empty() {
                anyhow::bail!("동기화 실패: {}", failed.join(", "));
            }
        }
        Commands::Daemon => {
            tracing::info!(
                source = ?config.source,
                interval_secs = config.update_interval_secs,
                status_addr = ?config.status_addr,
                "=== NSS 캐시 데몬 시작 ==="
            );

            let manager = Arc::new(Manager::from_config(&config)?);
            let signal = os_shutdown_signal().context("신호 핸들러 설치 실패")?;
            let received = run_daemon(manager, DaemonOptions::from(&config), signal).await?;

            tracing::info!(signal = ?received, "=== NSS 캐시 데몬 종료 ===");
        }
    }

    Ok(())
}

//! Standalone treasury sync CLI.

use clap::{Parser, Subcommand};
use treasury_collector::{jobs, CollectorConfig, CollectorError, SyncStats};
use treasury_core::{init_logging, LogConfig};
use treasury_sources::{BinanceConfig, BinanceReader, BtseConfig, BtseReader};
use treasury_store::{RtdbStore, ServiceAccountKey, SheetsStore, TokenSource};

#[derive(Parser)]
#[command(name = "treasury-collector")]
#[command(about = "Treasury Data Sync Runner", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 전체 동기화 워크플로우 실행
    RunAll,

    /// 단일 작업 실행 (이름은 list-jobs 참고)
    RunJob {
        /// 작업 이름 (예: "vault-trend")
        name: String,
    },

    /// 등록된 작업 목록 출력
    ListJobs,

    /// 데몬 모드: 주기적으로 전체 워크플로우 실행
    Daemon,
}

/// 설정으로부터 만들어진 외부 서비스 클라이언트 묶음.
struct Services {
    sheets: SheetsStore,
    binance: Option<BinanceReader>,
    btse: Option<BtseReader>,
    rtdb: Option<RtdbStore>,
}

impl Services {
    fn build(config: &CollectorConfig) -> Result<Self, CollectorError> {
        let token_source = match (&config.access_token, &config.service_account_b64) {
            (Some(token), _) => TokenSource::Static(token.clone()),
            (None, Some(encoded)) => {
                TokenSource::ServiceAccount(ServiceAccountKey::from_base64(encoded)?)
            }
            (None, None) => {
                return Err(CollectorError::Config(
                    "SHEETS_ACCESS_TOKEN 또는 SERVICE_ACCOUNT_B64 중 하나는 필요합니다"
                        .to_string(),
                ))
            }
        };
        let sheets = SheetsStore::new(&config.spreadsheet_id, token_source)?;

        let binance = match BinanceConfig::from_env() {
            Some(cfg) => Some(BinanceReader::new(cfg)?),
            None => None,
        };
        let btse = match BtseConfig::from_env() {
            Some(cfg) => Some(BtseReader::new(cfg)?),
            None => None,
        };
        let rtdb = match &config.exchange.rtdb_url {
            Some(url) => Some(RtdbStore::new(url, config.exchange.rtdb_auth.clone())?),
            None => None,
        };

        Ok(Self {
            sheets,
            binance,
            btse,
            rtdb,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화 (RUST_LOG가 있으면 CLI 레벨보다 우선)
    let mut log_config = LogConfig::from_env();
    log_config.level = format!("treasury_collector={}", cli.log_level);
    init_logging(log_config)?;

    tracing::info!("Treasury Sync Runner 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(spreadsheet_id = %config.spreadsheet_id, tz = %config.display_tz, "설정 로드 완료");

    if matches!(cli.command, Commands::ListJobs) {
        for name in jobs::JOB_NAMES {
            println!("{}", name);
        }
        return Ok(());
    }

    let services = Services::build(&config)?;

    match cli.command {
        Commands::ListJobs => unreachable!(),
        Commands::RunJob { name } => {
            run_job(&name, &services, &config).await?;
        }
        Commands::RunAll => {
            run_all(&services, &config).await;
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        tracing::info!("=== 워크플로우 실행 시작 ===");
                        run_all(&services, &config).await;
                        tracing::info!(
                            "=== 워크플로우 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }
        }
    }

    tracing::info!("Treasury Sync Runner 종료");
    Ok(())
}

/// 이름으로 단일 작업 실행. 작업 통계를 돌려줍니다.
async fn run_job(
    name: &str,
    services: &Services,
    config: &CollectorConfig,
) -> Result<SyncStats, CollectorError> {
    let stats = match name {
        "vault-trend" => {
            let stats = jobs::sync_vault_trend(&services.sheets, config).await?;
            stats.log_summary("볼트 트렌드 동기화");
            stats
        }
        "chain-position" => {
            let stats = jobs::sync_chain_position(&services.sheets, config).await?;
            stats.log_summary("온체인 포지션 동기화");
            stats
        }
        "exchange-balance" => {
            let stats = jobs::sync_exchange_balances(
                &services.sheets,
                services.binance.as_ref(),
                services.btse.as_ref(),
                config,
            )
            .await?;
            stats.log_summary("거래소 잔고 동기화");
            stats
        }
        "exchange-flow" => {
            let (Some(binance), Some(rtdb)) = (&services.binance, &services.rtdb) else {
                return Err(CollectorError::Config(
                    "exchange-flow 작업에는 Binance 키와 RTDB_URL이 필요합니다".to_string(),
                ));
            };
            let stats = jobs::sync_exchange_flows(binance, rtdb, config).await?;
            stats.log_summary("입출금 이벤트 동기화");
            stats
        }
        other => {
            return Err(CollectorError::Config(format!(
                "알 수 없는 작업: {}",
                other
            )))
        }
    };
    Ok(stats)
}

/// 활성화된 작업을 순서대로 실행. 한 작업의 실패는 기록만 하고
/// 다음 작업으로 진행하며, 사이클 합산 통계를 마지막에 남깁니다.
async fn run_all(services: &Services, config: &CollectorConfig) {
    let mut enabled: Vec<&str> = Vec::new();
    if config.vault_trend.enabled {
        enabled.push("vault-trend");
    }
    if config.position.enabled {
        enabled.push("chain-position");
    }
    if config.exchange.balance_enabled {
        enabled.push("exchange-balance");
    }
    if config.exchange.flow_enabled && services.binance.is_some() && services.rtdb.is_some() {
        enabled.push("exchange-flow");
    }

    tracing::info!(jobs = enabled.len(), "=== 전체 워크플로우 시작 ===");

    let mut cycle = SyncStats::new();
    for (idx, name) in enabled.iter().enumerate() {
        tracing::info!("Step {}/{}: {}", idx + 1, enabled.len(), name);

        match run_job(name, services, config).await {
            Ok(stats) => cycle.merge(&stats),
            Err(e) => tracing::error!(job = name, error = %e, "작업 실패"),
        }

        // 원천 API 부하 완화용 작업 간 딜레이
        if idx + 1 < enabled.len() {
            tokio::time::sleep(config.request_delay()).await;
        }
    }

    cycle.log_summary("전체 워크플로우");
}

//! courier-worker - ワーカープロセスのエントリポイント
//!
//! 1. 環境変数から WorkerConfig を読む
//! 2. ENABLE_DOMAINS のドメインを読み込み、queue ごとにワーカーを起動
//! 3. Ctrl-C まで動かし、実行中のタスクを終えてから終了
//!
//! `COURIER_RUN_DEMO=true` のときは、有効なドメインのデモ Workflow を投入して結果を表示し、
//! そのまま終了します。

use std::error::Error;
use std::future::Future;
use std::process::ExitCode;

use courier_core::app::{AppBuilder, Client, WorkerGroup};
use courier_core::domain::TaskQueue;
use courier_core::domains::{hello, pizza};
use courier_core::impls::InMemoryTransport;
use courier_core::typed::Workflow;
use courier_core::WorkerConfig;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let result = match WorkerConfig::from_env() {
        Ok(config) => run(config, shutdown_signal()).await,
        Err(err) => Err(err.into()),
    };
    exit_code(result)
}

fn exit_code(result: Result<(), Box<dyn Error>>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "worker process failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// ワーカーを起動し、`shutdown` が完了するまで動かす
async fn run(
    config: WorkerConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn Error>> {
    info!(
        domains = ?config.enabled_domains(),
        endpoint = config.engine_endpoint(),
        app_env = %config.app_env(),
        max_concurrent_tasks = config.max_concurrent_tasks(),
        "starting worker process"
    );
    let run_demo = config.run_demo();

    let app = AppBuilder::new(config).build()?;
    let codec = app.codec();
    let queues: Vec<TaskQueue> = app.bundles().queues().cloned().collect();

    let transport = InMemoryTransport::connect(app.config().engine_endpoint())?;
    let group = app.start(transport.clone()).await?;

    if run_demo {
        let client = Client::new(transport.clone(), codec);
        run_demos(&client, &queues).await;
        log_counts(&group);
        group.shutdown_and_join().await;
    } else {
        group.run_until(shutdown).await;
    }

    transport.close();
    info!("worker process stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // シグナルを待てないなら、止める手段がないので即 shutdown する
        error!(error = %err, "failed to listen for ctrl-c");
    }
}

async fn run_demos(client: &Client, queues: &[TaskQueue]) {
    for queue in queues {
        match queue.as_str() {
            hello::TASK_QUEUE => {
                let result = client
                    .execute_workflow::<hello::GreetingWorkflow>(queue, "Temporal".to_string())
                    .await;
                match result {
                    Ok(greeting) => println!("{}: {greeting}", hello::GreetingWorkflow::NAME),
                    Err(err) => warn!(%queue, error = %err, "greeting demo failed"),
                }
            }
            pizza::TASK_QUEUE => {
                let result = client
                    .execute_workflow::<pizza::PizzaOrderWorkflow>(queue, demo_order())
                    .await;
                match result {
                    Ok(receipt) => match serde_json::to_string_pretty(&receipt) {
                        Ok(json) => println!("{}: {json}", pizza::PizzaOrderWorkflow::NAME),
                        Err(err) => warn!(error = %err, "failed to render receipt"),
                    },
                    Err(err) => warn!(%queue, error = %err, "pizza demo failed"),
                }
            }
            _ => info!(%queue, "no demo for task queue"),
        }
    }
}

fn demo_order() -> pizza::PizzaOrder {
    pizza::PizzaOrder {
        order_id: "order-001".to_string(),
        customer_name: "Alice".to_string(),
        items: vec![
            pizza::PizzaItem {
                flavor: "Pepperoni".to_string(),
                size: "L".to_string(),
                quantity: 1,
            },
            pizza::PizzaItem {
                flavor: "Margherita".to_string(),
                size: "M".to_string(),
                quantity: 2,
            },
        ],
        delivery_address: pizza::Address {
            street: "123 Main St".to_string(),
            city: "Springfield".to_string(),
            zip_code: "12345".to_string(),
        },
        is_vip: true,
    }
}

fn log_counts(group: &WorkerGroup) {
    for queue in group.task_queues() {
        if let Some(counts) = group.counts(queue.as_str()) {
            info!(%queue, completed = counts.completed, failed = counts.failed, "worker counts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::app::ComposeError;
    use courier_core::config::ENABLE_DOMAINS;

    fn same_code(left: ExitCode, right: ExitCode) -> bool {
        format!("{left:?}") == format!("{right:?}")
    }

    #[tokio::test]
    async fn empty_domain_list_fails_with_no_workers() {
        let config =
            WorkerConfig::from_lookup(|key| (key == ENABLE_DOMAINS).then(String::new)).unwrap();

        let result = run(config, async {}).await;
        let err = result.as_ref().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ComposeError>(),
            Some(&ComposeError::NoWorkersRegistered)
        );
        assert!(same_code(exit_code(result), ExitCode::FAILURE));
    }

    #[tokio::test]
    async fn unknown_domains_only_fail_with_no_workers() {
        let config = WorkerConfig::default().with_enabled_domains(["billing"]);
        let err = run(config, async {}).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ComposeError>(),
            Some(ComposeError::NoWorkersRegistered)
        ));
    }

    #[tokio::test]
    async fn shutdown_signal_stops_a_running_worker_cleanly() {
        let config = WorkerConfig::default().with_enabled_domains([hello::DOMAIN]);
        let result = run(config, async {}).await;
        assert!(result.is_ok());
        assert!(same_code(exit_code(result), ExitCode::SUCCESS));
    }
}

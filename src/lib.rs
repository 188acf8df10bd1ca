pub mod capture;
pub mod commands;
pub mod config;
pub mod errors;
pub mod executor;
pub mod geometry;
pub mod grid;
pub mod highlight;
pub mod llm;
pub mod normalizer;
pub mod parser;
pub mod session;

use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use crate::capture::XcapCapture;
use crate::executor::EnigoPointer;
use crate::highlight::LogRenderer;
use crate::llm::image_ref::stores_from_config;
use crate::llm::ModelSession;
use crate::session::{AssistantEngine, EngineCommand, EngineHandle, EngineParts};

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = config::load_config_or_default();

    // Fall back to an empty session so the shell still starts; requests then
    // fail with a config error until a provider is set up.
    let session = match ModelSession::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to build model session; starting without providers");
            ModelSession::new(config.llm.active_provider.clone())
        }
    };
    let stores = match stores_from_config(&config.upload) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "image upload disabled; screenshots go inline");
            Vec::new()
        }
    };

    let parts = EngineParts {
        capture: Arc::new(XcapCapture::new()),
        pointer: Arc::new(EnigoPointer::new(config.executor.move_steps)),
        renderer: Box::new(LogRenderer),
        stores,
        session,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start async runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let (engine, handle) = AssistantEngine::new(config, parts);
        tracing::info!("spawning AssistantEngine background task");
        let engine_task = tokio::spawn(async move {
            engine.run_loop().await;
            tracing::info!("AssistantEngine task exited");
        });

        shell(handle).await;
        let _ = engine_task.await;
    });
}

/// Console stand-in for the UI: stdin lines in, notices out.
async fn shell(handle: EngineHandle) {
    let EngineHandle {
        commands,
        mut notices,
        cancel,
    } = handle;

    println!("{}", commands::HELP);

    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            if let Some(line) = commands::format_notice(&notice) {
                println!("{line}");
            }
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(l)) => l,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                };
                if line.trim() == "/help" {
                    println!("{}", commands::HELP);
                    continue;
                }
                match commands::parse_line(&line) {
                    Ok(Some(EngineCommand::Quit)) => break,
                    Ok(Some(cmd)) => {
                        if commands.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(msg) => println!("{msg}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                cancel.store(true, std::sync::atomic::Ordering::SeqCst);
                break;
            }
        }
    }

    let _ = commands.send(EngineCommand::Quit).await;
    drop(commands);
    let _ = printer.await;
}

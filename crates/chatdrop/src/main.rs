use anyhow::Context;
use chatdrop_engine::backend::Backend;
use chatdrop_engine::config::loader::ConfigLoader;
use chatdrop_engine::dispatcher::{DispatchOutcome, Dispatcher, MenuClick};
use chatdrop_engine::load_watch::PendingLoadWatch;
use chatdrop_engine::protocol::{SEND_MENU_ITEM, TabId};
use chatdrop_engine::retry::RetryPhase;
use chatdrop_h::backend::HeadlessBackend;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatdrop", version, about = "Send selected text to ChatGPT")]
struct Args {
    #[command(subcommand)]
    action: Action,

    /// Launch browser in visible mode (not headless)
    #[arg(long, global = true)]
    visible: bool,

    /// Config file (defaults to ./chatdrop.yaml, then ~/.chatdrop/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep the browser open until Ctrl-C so the prompt can be submitted
    #[arg(long, global = true)]
    keep_open: bool,
}

#[derive(Subcommand)]
enum Action {
    /// Send text the way the context-menu entry does ("-" reads stdin)
    Send { text: String },
    /// Send the selection of a page the way the toolbar icon does
    Icon {
        /// Page to read the selection from
        #[arg(long)]
        source: Option<String>,
    },
    /// Print the context-menu entry descriptor as JSON
    Menu,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the outcome line.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Action::Menu = args.action {
        println!("{}", serde_json::to_string_pretty(&SEND_MENU_ITEM)?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    if args.visible {
        config.browser.visible = true;
    }

    let mut backend = HeadlessBackend::new(config.browser.clone(), config.timing.clone());
    backend.launch().await.context("Failed to launch browser")?;
    let dispatcher = Dispatcher::new(config);

    let result = run(&args.action, &dispatcher, &mut backend).await;
    match &result {
        Ok(outcome) => println!("{}", describe(outcome)),
        Err(e) => tracing::error!("{:#}", e),
    }

    if args.keep_open {
        println!("Browser left open; press Ctrl-C to close it.");
        tokio::signal::ctrl_c().await?;
    }

    backend.close().await?;
    result.map(|_| ())
}

async fn run(
    action: &Action,
    dispatcher: &Dispatcher,
    backend: &mut HeadlessBackend,
) -> anyhow::Result<DispatchOutcome> {
    match action {
        Action::Send { text } => {
            let text = if text == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                text.clone()
            };
            Ok(dispatcher
                .on_context_menu(backend, &MenuClick::send(text))
                .await?)
        }
        Action::Icon { source } => {
            let active = active_tab(backend, source.as_deref()).await?;
            Ok(dispatcher.on_icon_clicked(backend, active).await?)
        }
        // Printed before the browser is launched.
        Action::Menu => Ok(DispatchOutcome::Ignored),
    }
}

/// The tab the icon was clicked in: the loaded source page, or a blank tab.
async fn active_tab(backend: &mut HeadlessBackend, source: Option<&str>) -> anyhow::Result<TabId> {
    let pending = PendingLoadWatch::new(backend.subscribe_tabs()?);
    let tab = backend.open_tab(source.unwrap_or("about:blank")).await?;
    pending
        .bind(tab)
        .wait()
        .await
        .context("Source page did not load")?;
    Ok(tab)
}

fn describe(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Ignored => "Nothing to send.".to_string(),
        DispatchOutcome::OpenedOnly { tab } => format!("Opened ChatGPT in tab {}.", tab),
        DispatchOutcome::LoadFailed { tab, reason } => {
            format!("Tab {} did not load ({}); insert the text manually.", tab, reason)
        }
        DispatchOutcome::Delivered { tab, report } => match report.phase {
            RetryPhase::Succeeded => format!(
                "Inserted into tab {} after {} attempt(s).",
                tab,
                report.attempts.len()
            ),
            _ => format!(
                "Could not insert into tab {} after {} attempts; insert the text manually.",
                tab,
                report.attempts.len()
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["chatdrop", "send", "hello", "--visible"]).unwrap();
        assert!(args.visible);
        assert!(matches!(args.action, Action::Send { ref text } if text == "hello"));
    }

    #[test]
    fn icon_source_is_optional() {
        let args = Args::try_parse_from(["chatdrop", "icon"]).unwrap();
        assert!(matches!(args.action, Action::Icon { source: None }));
    }

    #[test]
    fn describes_outcomes() {
        assert_eq!(
            describe(&DispatchOutcome::OpenedOnly { tab: TabId(3) }),
            "Opened ChatGPT in tab #3."
        );
    }
}

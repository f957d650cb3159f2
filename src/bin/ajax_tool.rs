use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use persistkit::ajax::{
    AjaxConfig, AjaxRequest, AjaxScheduler, CallOptions, HttpTransport, StringLoader,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ajax-tool")]
#[command(about = "Issue batched ajax web service calls against a site")]
struct Cli {
    /// Site URL carrying the session key, e.g. https://lms.example.org/?sesskey=abc
    #[arg(long, global = true, env = "AJAX_TOOL_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Call one or more web service methods in a single batch
    Call {
        /// Send through the no-login service script
        #[arg(long)]
        nologin: bool,
        /// Send immediately instead of waiting for the batching delay
        #[arg(long)]
        sync: bool,
        /// `methodname=<json args>` pairs; args default to `{}`
        #[arg(required = true)]
        requests: Vec<String>,
    },
    /// Fetch one language string
    String {
        component: String,
        key: String,
        #[arg(long, default_value = "en")]
        lang: String,
        /// Value substituted for {$a}
        #[arg(long)]
        param: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli
        .url
        .ok_or_else(|| anyhow!("--url (or AJAX_TOOL_URL) is required"))?;
    let config = AjaxConfig::from_url(&url).map_err(|err| anyhow!(err))?;
    let transport = Arc::new(HttpTransport::new(config.clone()));
    let scheduler = AjaxScheduler::new(config, transport);

    match cli.command {
        Command::Call {
            nologin,
            sync,
            requests,
        } => call(&scheduler, &requests, nologin, sync).await,
        Command::String {
            component,
            key,
            lang,
            param,
        } => {
            let loader = StringLoader::new(scheduler).with_lang(lang);
            let text = loader
                .get_string(&key, &component, param.as_deref(), None)
                .await
                .with_context(|| format!("Failed to fetch string '{}' of '{}'", key, component))?;
            println!("{}", text);
            Ok(())
        }
    }
}

fn parse_request(raw: &str) -> Result<AjaxRequest> {
    let (methodname, args) = match raw.split_once('=') {
        Some((methodname, args)) => (methodname, args),
        None => (raw, "{}"),
    };
    if methodname.trim().is_empty() {
        return Err(anyhow!("Request '{}' has no method name", raw));
    }
    let args: serde_json::Value = serde_json::from_str(args)
        .with_context(|| format!("Invalid JSON arguments for '{}'", methodname))?;
    Ok(AjaxRequest::new(methodname.trim(), args))
}

async fn call(scheduler: &AjaxScheduler, raw: &[String], nologin: bool, sync: bool) -> Result<()> {
    let requests = raw
        .iter()
        .map(|request| parse_request(request))
        .collect::<Result<Vec<_>>>()?;

    let mut options = CallOptions::default().login_required(!nologin);
    options.async_call = !sync;

    let handles = scheduler.call(requests, options).await;
    let results = futures::future::join_all(handles).await;

    let mut failed = 0;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(data) => println!("{}", serde_json::json!({"index": index, "data": data})),
            Err(err) => {
                failed += 1;
                println!("{}", serde_json::json!({"index": index, "error": err.to_string()}));
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} requests failed", failed, raw.len()));
    }
    Ok(())
}

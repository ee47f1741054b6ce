use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use futures::StreamExt;
use genai_provider_rs::{
    init_logging, ChatMessage, ClientConfig, ImageAspectRatio, ImageGenerationParams, ProviderClient,
    TextGenerationParams,
};
use std::io::{self, Write};

fn cli() -> Command {
    Command::new("genai-provider")
        .version("0.1.0")
        .about("Call generative AI providers through a single interface")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON file with http settings and providers")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("provider")
                .long("provider")
                .value_name("NAME")
                .help("Name of the configured provider to use")
                .required(true)
                .action(ArgAction::Set),
        )
        .subcommand_required(true)
        .subcommand(Command::new("models").about("List available models"))
        .subcommand(Command::new("balance").about("Show the account balance"))
        .subcommand(
            Command::new("chat")
                .about("Generate text")
                .arg(Arg::new("model").long("model").required(true))
                .arg(Arg::new("prompt").long("prompt").required(true))
                .arg(
                    Arg::new("stream")
                        .long("stream")
                        .help("Print chunks as they arrive")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("image")
                .about("Generate images")
                .arg(Arg::new("model").long("model").default_value("seedream-4.0"))
                .arg(Arg::new("prompt").long("prompt").required(true))
                .arg(
                    Arg::new("aspect-ratio")
                        .long("aspect-ratio")
                        .default_value("square")
                        .value_parser(value_parser!(ImageAspectRatio)),
                )
                .arg(
                    Arg::new("count")
                        .long("count")
                        .default_value("1")
                        .value_parser(value_parser!(u32)),
                ),
        )
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> anyhow::Result<&'a String> {
    matches
        .get_one::<String>(id)
        .with_context(|| format!("missing --{id}"))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    io::stdout().flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let matches = cli().get_matches();

    let config_path = required(&matches, "config")?;
    let mut config = ClientConfig::from_file(config_path)
        .with_context(|| format!("reading config {config_path}"))?;
    config.apply_env_overrides();

    let setting = config.require_provider(required(&matches, "provider")?)?;
    let client = ProviderClient::new(&config.http)?;

    match matches.subcommand() {
        Some(("models", _)) => {
            for model in client.list_models(setting).await? {
                print_json(&model)?;
            }
        }
        Some(("balance", _)) => {
            print_json(&serde_json::json!({ "balance": client.get_balance(setting).await? }))?;
        }
        Some(("chat", sub)) => {
            let params = TextGenerationParams::new(required(sub, "model")?);
            let messages = vec![ChatMessage::user(required(sub, "prompt")?)];
            if sub.get_flag("stream") {
                let mut stream = client.stream_text(setting, &messages, &params).await?;
                while let Some(chunk) = stream.next().await {
                    print_json(&chunk?)?;
                }
            } else {
                print_json(&client.generate_text(setting, &messages, &params).await?)?;
            }
        }
        Some(("image", sub)) => {
            let aspect_ratio = sub
                .get_one::<ImageAspectRatio>("aspect-ratio")
                .copied()
                .unwrap_or_default();
            let count = sub.get_one::<u32>("count").copied().unwrap_or(1);
            let params = ImageGenerationParams::new(required(sub, "model")?, required(sub, "prompt")?)
                .with_aspect_ratio(aspect_ratio)
                .with_num_of_images(count);
            let result = client.generate_image(setting, &params).await?;
            for item in &result.items {
                print_json(item)?;
            }
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}

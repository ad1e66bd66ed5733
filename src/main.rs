use std::{error::Error, time::Duration};

use a2squery::Client;
use clap::Parser;
use env_logger::Env;
use log::error;

/// Rules printed before the list is cut short.
const MAX_RULES_SHOWN: usize = 5;

#[derive(Parser, Debug)]
#[clap(name = "a2squery")]
struct Opt {
    /// Game server to query, as host:port
    host: String,
    /// Seconds to wait for each reply (default 5)
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let opt = Opt::parse();
    let timeout_dur: Option<Duration> = opt.timeout.map(Duration::from_secs);

    let mut client = Client::new(timeout_dur);
    client.connect(&opt.host).await?;

    let info = client.info().await?;
    println!("Server: {}", info.name);
    println!("Map: {}", info.map);
    println!("Players: {}/{}", info.players, info.max_players);
    println!("Version: {}", info.version);

    let features = client.check_features().await;

    if features.players {
        match client.players().await {
            Ok(players) => {
                println!("\nPlayers online: {}", players.len());
                for player in &players {
                    println!("  {} (Score: {})", player.name, player.score);
                }
            }
            Err(err) => error!("error getting players: {}", err),
        }
    }

    if features.rules {
        match client.rules().await {
            Ok(rules) => {
                println!("\nServer rules: {}", rules.len());
                for rule in rules.iter().take(MAX_RULES_SHOWN) {
                    println!("  {} = {}", rule.name, rule.value);
                }
                if rules.len() > MAX_RULES_SHOWN {
                    println!("  ... and {} more", rules.len() - MAX_RULES_SHOWN);
                }
            }
            Err(err) => error!("error getting rules: {}", err),
        }
    }

    client.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_timeout() {
        let opt = Opt::try_parse_from(["a2squery", "127.0.0.1:27015", "3"]).unwrap();

        assert_eq!(opt.host, "127.0.0.1:27015");
        assert_eq!(opt.timeout, Some(3));
    }

    #[test]
    fn test_timeout_is_optional() {
        let opt = Opt::try_parse_from(["a2squery", "tf2.example.com:27015"]).unwrap();

        assert_eq!(opt.timeout, None);
        assert!(Opt::try_parse_from(["a2squery"]).is_err());
        assert!(Opt::try_parse_from(["a2squery", "host:1", "soon"]).is_err());
    }
}

use clap::Parser;
use log::{error, info};
use server::config::GameConfig;
use server::network::Server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value = "40")]
    tick_rate: u32,

    /// Maximum number of concurrent connections
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Vertical gap between upper and lower pipes, in pixels
    #[arg(long, default_value = "150")]
    pipe_gap: f32,

    /// Seed for pipe placement (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Countdown before a round starts, in seconds
    #[arg(long, default_value = "3")]
    countdown: f32,

    /// End a multiplayer round once a live player reaches this score
    #[arg(long)]
    score_limit: Option<f32>,

    /// Points every live bird earns per tick
    #[arg(long, default_value = "0")]
    survival_reward: f32,
}

impl Args {
    fn game_config(&self) -> GameConfig {
        GameConfig {
            tick_rate: self.tick_rate,
            pipe_gap: self.pipe_gap,
            seed: self.seed,
            countdown_secs: self.countdown,
            score_limit: self.score_limit,
            survival_reward: self.survival_reward,
            ..GameConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.game_config();
    let address = format!("{}:{}", args.host, args.port);

    info!(
        "Starting server on {} at {} Hz (max {} clients)",
        address, config.tick_rate, args.max_clients
    );
    if let Some(seed) = config.seed {
        info!("Pipe seed: {}", seed);
    }

    let mut server = Server::new(&address, config, args.max_clients).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args_build_valid_config() {
        let args = Args::parse_from(["server"]);
        let config = args.game_config();

        assert_eq!(args.port, 8080);
        assert_eq!(config.tick_rate, 40);
        assert_eq!(config.pipe_gap, 150.0);
        assert_eq!(config.score_limit, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "server",
            "--tick-rate",
            "60",
            "--seed",
            "7",
            "--score-limit",
            "10",
            "-H",
            "0.0.0.0",
        ]);
        let config = args.game_config();

        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.score_limit, Some(10.0));
    }
}

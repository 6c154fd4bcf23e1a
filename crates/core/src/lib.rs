pub mod config;
pub mod time;

pub use config::{env_opt, env_or, env_parse, load_dotenv};
pub use time::{format_duration, format_time, wall_clock};

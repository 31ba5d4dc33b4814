use crate::core::search::MemberSearch;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "member-query")]
#[command(about = "Search members by optional username and age")]
pub struct CliConfig {
    /// TOML file with [[teams]] and [[members]]; the built-in fixture is used when omitted
    #[arg(long)]
    pub fixtures: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub age: Option<i64>,

    #[arg(long, default_value = "0")]
    pub offset: usize,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, help = "Print the SQL where clause for the search")]
    pub show_sql: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn search(&self) -> MemberSearch {
        MemberSearch::new(self.username.as_deref(), self.age)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.fixtures {
            validation::validate_path("fixtures", path)?;
        }
        if let Some(age) = self.age {
            validation::validate_range("age", age, 0, 150)?;
        }
        if let Some(limit) = self.limit {
            validation::validate_range("limit", limit, 1, usize::MAX)?;
        }
        Ok(())
    }
}

use crate::domain::model::{Member, NewMember, Team};
use crate::domain::ports::MemberStore;
use crate::utils::error::{QueryError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const MAX_AGE: i64 = 150;

/// Teams and members to load into a store before querying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    #[serde(default)]
    pub teams: Vec<TeamFixture>,
    #[serde(default)]
    pub members: Vec<MemberFixture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamFixture {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberFixture {
    pub username: String,
    #[serde(default)]
    pub age: i64,
    /// Team name; must match one of `teams`.
    pub team: Option<String>,
}

/// What `FixtureConfig::seed` wrote to the store.
#[derive(Debug, Clone)]
pub struct SeededFixture {
    pub teams: Vec<Team>,
    pub members: Vec<Member>,
}

impl SeededFixture {
    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name == name)
    }
}

impl Default for FixtureConfig {
    /// teamA with member1 (10) and member2 (20), teamB with member3 (30) and member4 (40).
    fn default() -> Self {
        let member = |username: &str, age: i64, team: &str| MemberFixture {
            username: username.to_string(),
            age,
            team: Some(team.to_string()),
        };
        Self {
            teams: vec![
                TeamFixture {
                    name: "teamA".to_string(),
                },
                TeamFixture {
                    name: "teamB".to_string(),
                },
            ],
            members: vec![
                member("member1", 10, "teamA"),
                member("member2", 20, "teamA"),
                member("member3", 30, "teamB"),
                member("member4", 40, "teamB"),
            ],
        }
    }
}

impl FixtureConfig {
    /// 從 TOML 檔案載入
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(QueryError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| QueryError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TEAM_NAME})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| QueryError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        for team in &self.teams {
            validation::validate_non_empty_string("teams.name", &team.name)?;
        }

        for member in &self.members {
            validation::validate_non_empty_string("members.username", &member.username)?;
            validation::validate_range("members.age", member.age, 0, MAX_AGE)?;
            if let Some(team) = &member.team {
                if self.teams.is_empty() {
                    return Err(QueryError::MissingConfigError {
                        field: "teams".to_string(),
                    });
                }
                if !self.teams.iter().any(|t| &t.name == team) {
                    return Err(QueryError::UnknownTeam { name: team.clone() });
                }
            }
        }

        Ok(())
    }

    /// Persists every team, then every member, in file order.
    pub async fn seed<S: MemberStore>(&self, store: &S) -> Result<SeededFixture> {
        self.validate_config()?;

        let mut by_name = HashMap::new();
        let mut teams = Vec::with_capacity(self.teams.len());
        for fixture in &self.teams {
            let team = store.persist_team(&fixture.name).await?;
            by_name.insert(team.name.clone(), team.id);
            teams.push(team);
        }

        let mut members = Vec::with_capacity(self.members.len());
        for fixture in &self.members {
            let team = match &fixture.team {
                Some(name) => Some(*by_name.get(name).ok_or_else(|| QueryError::UnknownTeam {
                    name: name.clone(),
                })?),
                None => None,
            };
            let member = store
                .persist_member(NewMember::new(fixture.username.clone(), fixture.age, team))
                .await?;
            members.push(member);
        }

        tracing::info!("seeded {} teams and {} members", teams.len(), members.len());
        Ok(SeededFixture { teams, members })
    }
}

impl Validate for FixtureConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_fixture() {
        let toml_content = r#"
[[teams]]
name = "teamA"

[[members]]
username = "member1"
age = 10
team = "teamA"

[[members]]
username = "loner"
"#;

        let config = FixtureConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.teams.len(), 1);
        assert_eq!(config.members.len(), 2);
        assert_eq!(config.members[0].team.as_deref(), Some("teamA"));
        assert_eq!(config.members[1].age, 0);
        assert!(config.members[1].team.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MEMBER_QUERY_TEST_TEAM", "teamZ");

        let toml_content = r#"
[[teams]]
name = "${MEMBER_QUERY_TEST_TEAM}"

[[members]]
username = "${MEMBER_QUERY_TEST_UNSET}"
"#;

        let config = FixtureConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.teams[0].name, "teamZ");
        assert_eq!(config.members[0].username, "${MEMBER_QUERY_TEST_UNSET}");

        std::env::remove_var("MEMBER_QUERY_TEST_TEAM");
    }

    #[test]
    fn test_validation_rejects_unknown_team_and_bad_age() {
        let toml_content = r#"
[[teams]]
name = "teamA"

[[members]]
username = "member1"
team = "teamX"
"#;
        let config = FixtureConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(QueryError::UnknownTeam { .. })
        ));

        let toml_content = r#"
[[members]]
username = "member1"
age = -3
"#;
        let config = FixtureConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(QueryError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_team_reference_without_teams_is_missing_config() {
        let toml_content = r#"
[[members]]
username = "member1"
team = "teamA"
"#;
        let config = FixtureConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            &err,
            QueryError::MissingConfigError { field } if field == "teams"
        ));

        let loner = FixtureConfig::from_toml_str("[[members]]\nusername = \"loner\"\n").unwrap();
        assert!(loner.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = FixtureConfig::from_toml_str("[[teams]\nname = ").unwrap_err();
        assert!(matches!(err, QueryError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_fixture_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[[teams]]\nname = \"teamA\"\n")
            .unwrap();

        let config = FixtureConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.teams[0].name, "teamA");
    }

    #[tokio::test]
    async fn test_seed_default_fixture() {
        let store = InMemoryStore::new();
        let seeded = FixtureConfig::default().seed(&store).await.unwrap();

        assert_eq!(seeded.teams.len(), 2);
        assert_eq!(seeded.members.len(), 4);
        let team_a = seeded.team("teamA").unwrap();
        assert_eq!(seeded.members[1].team_id(), Some(team_a.id));
        assert_eq!(store.members().await.unwrap().len(), 4);
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

/// A member's link to its team.
///
/// Members come out of the store with an `Unloaded` reference; only a fetch
/// join resolves it to `Loaded`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TeamRef {
    #[default]
    None,
    Unloaded { id: TeamId },
    Loaded { team: Team },
}

impl TeamRef {
    pub fn id(&self) -> Option<TeamId> {
        match self {
            TeamRef::None => None,
            TeamRef::Unloaded { id } => Some(*id),
            TeamRef::Loaded { team } => Some(team.id),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, TeamRef::Loaded { .. })
    }

    pub fn loaded(&self) -> Option<&Team> {
        match self {
            TeamRef::Loaded { team } => Some(team),
            _ => None,
        }
    }

    /// Drops a loaded team back to a bare reference.
    pub fn unload(&self) -> TeamRef {
        match self.id() {
            Some(id) => TeamRef::Unloaded { id },
            None => TeamRef::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub username: String,
    pub age: i64,
    pub team: TeamRef,
}

impl Member {
    pub fn team_id(&self) -> Option<TeamId> {
        self.team.id()
    }
}

/// Fields of a member that have not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub username: String,
    pub age: i64,
    pub team: Option<TeamId>,
}

impl NewMember {
    pub fn new(username: impl Into<String>, age: i64, team: Option<TeamId>) -> Self {
        Self {
            username: username.into(),
            age,
            team,
        }
    }

    /// A member with no age and no team, as used by the theta join fixtures.
    pub fn named(username: impl Into<String>) -> Self {
        Self::new(username, 0, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDto {
    pub username: String,
    pub age: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub name: String,
    pub age: i64,
}

use crate::domain::model::{Member, MemberId, NewMember, Team, TeamId, TeamRef};
use crate::domain::ports::MemberStore;
use crate::utils::error::{QueryError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    teams: Vec<Team>,
    members: Vec<Member>,
    next_team_id: u64,
    next_member_id: u64,
}

/// Process-local store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemberStore for InMemoryStore {
    async fn teams(&self) -> Result<Vec<Team>> {
        Ok(self.state.read().await.teams.clone())
    }

    async fn members(&self) -> Result<Vec<Member>> {
        Ok(self.state.read().await.members.clone())
    }

    async fn persist_team(&self, name: &str) -> Result<Team> {
        let mut state = self.state.write().await;
        state.next_team_id += 1;
        let team = Team {
            id: TeamId(state.next_team_id),
            name: name.to_string(),
        };
        state.teams.push(team.clone());
        tracing::debug!("persisted team {:?}", team);
        Ok(team)
    }

    async fn persist_member(&self, member: NewMember) -> Result<Member> {
        let mut state = self.state.write().await;
        let team = match member.team {
            Some(id) if state.teams.iter().any(|t| t.id == id) => TeamRef::Unloaded { id },
            Some(id) => {
                return Err(QueryError::StoreError {
                    message: format!("team {} does not exist", id.0),
                })
            }
            None => TeamRef::None,
        };
        state.next_member_id += 1;
        let stored = Member {
            id: MemberId(state.next_member_id),
            username: member.username,
            age: member.age,
            team,
        };
        state.members.push(stored.clone());
        tracing::debug!("persisted member {:?}", stored);
        Ok(stored)
    }

    async fn replace_members(&self, updated: Vec<Member>, deleted: Vec<Member>) -> Result<()> {
        let mut state = self.state.write().await;
        for member in updated {
            let slot = state
                .members
                .iter_mut()
                .find(|m| m.id == member.id)
                .ok_or_else(|| QueryError::StoreError {
                    message: format!("member {} does not exist", member.id.0),
                })?;
            *slot = Member {
                team: member.team.unload(),
                ..member
            };
        }
        state
            .members
            .retain(|m| !deleted.iter().any(|d| d.id == m.id));
        Ok(())
    }
}

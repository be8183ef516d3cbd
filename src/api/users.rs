use serde::{Deserialize, Serialize};

use super::{null_as_default, Client, Variables};
use crate::error::ProviderError;

const CURRENT_USER_QUERY: &str = r#"
query CurrentUser {
  currentUser {
    id
    username
    fullName
    email
    isRoot
  }
}
"#;

/// A Humio user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned user ID.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Display name; empty when unset.
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    /// Email address; empty when unset.
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    /// Whether the user has root privileges.
    #[serde(default)]
    pub is_root: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserData {
    current_user: User,
}

/// User operations.
pub struct Users<'a> {
    client: &'a Client,
}

impl<'a> Users<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// The user the API token belongs to.
    pub async fn current(&self) -> Result<User, ProviderError> {
        let data: CurrentUserData = self
            .client
            .query(CURRENT_USER_QUERY, Variables::new())
            .await?;
        Ok(data.current_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHumio;

    #[tokio::test]
    async fn test_current_user() {
        let fake = FakeHumio::new();
        let user = fake.client().users().current().await.unwrap();
        assert_eq!(user, fake.current_user());
        assert!(fake.requests()[0].variables.is_empty());
    }
}

use async_trait::async_trait;
use serde_json::{json, Value};

use super::DataSourceMapper;
use crate::api::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// `humio_user`: the user the API token belongs to.
pub struct UserDataSource;

#[async_trait]
impl DataSourceMapper for UserDataSource {
    fn type_name(&self) -> &'static str {
        "humio_user"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("The user owning the configured API token")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("username", Attribute::computed_string())
            .with_attribute("full_name", Attribute::computed_string())
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("is_root", Attribute::computed_bool())
    }

    async fn read(&self, client: &Client, _config: Value) -> Result<Value, ProviderError> {
        let user = client.users().current().await?;
        Ok(json!({
            "id": user.id,
            "username": user.username,
            "full_name": user.full_name,
            "email": user.email,
            "is_root": user.is_root,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::User;
    use crate::testing::FakeHumio;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_read_flattens_user() {
        let fake = FakeHumio::new().with_current_user(User {
            id: "u-42".to_string(),
            username: "jdoe".to_string(),
            full_name: "J. Doe".to_string(),
            email: "jdoe@example.com".to_string(),
            is_root: false,
        });

        let state = UserDataSource.read(&fake.client(), Value::Null).await.unwrap();
        assert_eq!(
            state,
            json!({
                "id": "u-42",
                "username": "jdoe",
                "full_name": "J. Doe",
                "email": "jdoe@example.com",
                "is_root": false,
            })
        );
    }
}

use crate::core::{Question, QuestionBank, QuestionStore};
use crate::utils::error::{QuizError, Result};
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::{Client, Collection};

pub struct MongoStore {
    collection: Collection<QuestionBank>,
}

impl MongoStore {
    /// Connects and pings the server so bad credentials fail before any upload.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        tracing::info!("🔌 Connected to MongoDB database {}", database);

        Ok(Self {
            collection: db.collection(collection),
        })
    }
}

#[async_trait]
impl QuestionStore for MongoStore {
    async fn find(&self, key: &str) -> Result<Option<QuestionBank>> {
        Ok(self.collection.find_one(doc! { "key": key }).await?)
    }

    async fn insert(&self, bank: &QuestionBank) -> Result<()> {
        self.collection.insert_one(bank).await?;
        Ok(())
    }

    async fn update_questions(&self, key: &str, questions: &[Question]) -> Result<()> {
        let questions =
            mongodb::bson::to_bson(questions).map_err(|e| QuizError::StoreError {
                message: format!("cannot encode questions for {}: {}", key, e),
            })?;
        self.collection
            .update_one(doc! { "key": key }, doc! { "$set": { "questions": questions } })
            .await?;
        Ok(())
    }
}

use bistro_db::models::{Address, ContactInfo, Faq, OpeningHours, Restaurant, SiteContent};
use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use tracing::info;

use super::base::{BaseDao, DaoError, DaoResult};

/// Partial update of the public site information.
#[derive(Debug, Default)]
pub struct RestaurantPatch {
    pub name: Option<String>,
    pub address: Option<Address>,
    pub site: Option<SiteContent>,
    pub contact: Option<ContactInfo>,
    pub opening_hours: Option<Vec<OpeningHours>>,
}

pub struct RestaurantDao {
    pub base: BaseDao<Restaurant>,
}

impl RestaurantDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Restaurant::COLLECTION),
        }
    }

    /// Creates the restaurant document on first start.
    pub async fn ensure(&self, id: ObjectId, name: &str) -> DaoResult<Restaurant> {
        let now = DateTime::now();
        let result = self
            .base
            .collection()
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$setOnInsert": {
                        "name": name,
                        "categories": [],
                        "faqs": [],
                        "opening_hours": [],
                        "created_at": now,
                        "updated_at": now,
                    }
                },
            )
            .upsert(true)
            .await?;

        if result.upserted_id.is_some() {
            info!(restaurant_id = %id, name, "Created restaurant document");
        }
        self.base.find_by_id(id).await
    }

    pub async fn get(&self, id: ObjectId) -> DaoResult<Restaurant> {
        self.base.find_by_id(id).await
    }

    pub async fn update(&self, id: ObjectId, patch: RestaurantPatch) -> DaoResult<Restaurant> {
        let mut set = Document::new();
        if let Some(name) = patch.name {
            set.insert("name", name);
        }
        if let Some(address) = patch.address {
            set.insert("address", bson::to_bson(&address)?);
        }
        if let Some(site) = patch.site {
            set.insert("site", bson::to_bson(&site)?);
        }
        if let Some(contact) = patch.contact {
            set.insert("contact", bson::to_bson(&contact)?);
        }
        if let Some(hours) = patch.opening_hours {
            set.insert("opening_hours", bson::to_bson(&hours)?);
        }

        if !set.is_empty() && !self.base.update_by_id(id, doc! { "$set": set }).await? {
            return Err(DaoError::NotFound);
        }
        self.get(id).await
    }

    pub async fn list_faqs(&self, id: ObjectId) -> DaoResult<Vec<Faq>> {
        let mut faqs = self.get(id).await?.faqs;
        faqs.sort_by_key(|f| f.position);
        Ok(faqs)
    }

    pub async fn add_faq(
        &self,
        id: ObjectId,
        question: String,
        answer: String,
        position: Option<i32>,
    ) -> DaoResult<Faq> {
        let position = match position {
            Some(p) => p,
            None => self
                .get(id)
                .await?
                .faqs
                .iter()
                .map(|f| f.position + 1)
                .max()
                .unwrap_or(0),
        };
        let faq = Faq {
            id: ObjectId::new(),
            question,
            answer,
            position,
        };

        if !self
            .base
            .update_by_id(id, doc! { "$push": { "faqs": bson::to_bson(&faq)? } })
            .await?
        {
            return Err(DaoError::NotFound);
        }
        Ok(faq)
    }

    pub async fn update_faq(
        &self,
        id: ObjectId,
        faq_id: ObjectId,
        question: Option<String>,
        answer: Option<String>,
        position: Option<i32>,
    ) -> DaoResult<Faq> {
        let mut set = Document::new();
        if let Some(q) = question {
            set.insert("faqs.$.question", q);
        }
        if let Some(a) = answer {
            set.insert("faqs.$.answer", a);
        }
        if let Some(p) = position {
            set.insert("faqs.$.position", p);
        }

        let filter = doc! { "_id": id, "faqs.id": faq_id };
        if set.is_empty() {
            if self.base.count(filter).await? == 0 {
                return Err(DaoError::NotFound);
            }
        } else if !self.base.update_one(filter, doc! { "$set": set }).await? {
            return Err(DaoError::NotFound);
        }

        self.get(id)
            .await?
            .faqs
            .into_iter()
            .find(|f| f.id == faq_id)
            .ok_or(DaoError::NotFound)
    }

    pub async fn delete_faq(&self, id: ObjectId, faq_id: ObjectId) -> DaoResult<()> {
        let matched = self
            .base
            .update_one(
                doc! { "_id": id, "faqs.id": faq_id },
                doc! { "$pull": { "faqs": { "id": faq_id } } },
            )
            .await?;
        if !matched {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }
}

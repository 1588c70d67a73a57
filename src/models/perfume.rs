use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields accepted by the search endpoint.
pub const SEARCHABLE_FIELDS: &[&str] = &[
    "name",
    "brand",
    "types",
    "categories",
    "sizes",
    "price",
    "description",
    "stock",
];

/// A document in the `perfumes` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perfume {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub brand: String,
    /// e.g. Eau de Parfum, Pure Perfume
    pub types: String,
    /// e.g. Floral, Fresh, Woody
    pub categories: String,
    /// e.g. 50ml, 100ml
    pub sizes: String,
    #[serde(default)]
    pub image: String,
    pub price: String,
    pub description: String,
    pub stock: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerfumeFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub types: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub sizes: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock: String,
}

impl PerfumeFields {
    /// Assigns a named form field; unknown names are ignored.
    pub fn set(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = value,
            "brand" => self.brand = value,
            "types" => self.types = value,
            "categories" => self.categories = value,
            "sizes" => self.sizes = value,
            "price" => self.price = value,
            "description" => self.description = value,
            "stock" => self.stock = value,
            _ => {}
        }
    }
}

impl Perfume {
    pub fn new(id: ObjectId, fields: PerfumeFields, image: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: fields.name,
            brand: fields.brand,
            types: fields.types,
            categories: fields.categories,
            sizes: fields.sizes,
            image,
            price: fields.price,
            description: fields.description,
            stock: fields.stock,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PerfumeChanges {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub types: Option<String>,
    pub categories: Option<String>,
    pub sizes: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub stock: Option<String>,
}

impl PerfumeChanges {
    /// Supplied fields as `(name, value)` pairs, in storage field order.
    pub fn supplied(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", &self.name),
            ("brand", &self.brand),
            ("types", &self.types),
            ("categories", &self.categories),
            ("sizes", &self.sizes),
            ("price", &self.price),
            ("description", &self.description),
            ("stock", &self.stock),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfumeResponse {
    pub perfume_id: String,
    pub name: String,
    pub brand: String,
    pub types: String,
    pub categories: String,
    pub sizes: String,
    pub image: String,
    pub price: String,
    pub description: String,
    pub stock: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Perfume> for PerfumeResponse {
    fn from(p: Perfume) -> Self {
        Self {
            perfume_id: p.id.to_hex(),
            name: p.name,
            brand: p.brand,
            types: p.types,
            categories: p.categories,
            sizes: p.sizes,
            image: p.image,
            price: p.price,
            description: p.description,
            stock: p.stock,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

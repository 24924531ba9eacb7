use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: i32,
    pub category_id: Option<i32>,
    /// Cached copy of the owning category's name; also holds a free-form
    /// name for products created without a category link.
    pub category_name: String,
    pub brand: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub image_url: Option<String>,
    pub rating: f32,
    pub review_count: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub sku: Option<String>,
    pub tags: Option<String>,
}

impl Model {
    pub fn final_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    pub fn discount_percentage(&self) -> Decimal {
        match self.discount_price {
            Some(discount) => {
                ((Decimal::ONE - discount / self.price) * Decimal::from(100)).round_dp(0)
            }
            None => Decimal::ZERO,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.discount_price.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub release_date: String,
    pub genre: String,
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::box_office::Entity")]
    BoxOffice,
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
}

impl Related<super::box_office::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BoxOffice.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

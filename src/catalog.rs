use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use tracing::debug;

use crate::{
    entities::{director, genre, movie},
    error::{AppError, AppResult},
    models::{MovieFilter, NamePatch},
};

/// Store handle shared by every request handler.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn list_movies(&self, filter: MovieFilter) -> AppResult<Vec<movie::Model>> {
        let mut query = movie::Entity::find();
        if let Some(genre_id) = filter.genre_id {
            query = query.filter(movie::Column::GenreId.eq(genre_id));
        }
        if let Some(director_id) = filter.director_id {
            query = query.filter(movie::Column::DirectorId.eq(director_id));
        }

        Ok(query.order_by_asc(movie::Column::Id).all(&self.db).await?)
    }

    pub async fn get_movie(&self, id: i32) -> AppResult<movie::Model> {
        let query = movie::Entity::find().filter(movie::Column::Id.eq(id));
        fetch_exactly_one(&self.db, query, "movie", id).await
    }

    pub async fn list_directors(&self) -> AppResult<Vec<director::Model>> {
        Ok(director::Entity::find().order_by_asc(director::Column::Id).all(&self.db).await?)
    }

    pub async fn get_director(&self, id: i32) -> AppResult<director::Model> {
        let query = director::Entity::find().filter(director::Column::Id.eq(id));
        fetch_exactly_one(&self.db, query, "director", id).await
    }

    pub async fn create_director(&self, name: String) -> AppResult<director::Model> {
        let model =
            director::ActiveModel { name: Set(name), ..Default::default() }.insert(&self.db).await?;
        debug!(id = model.id, "director created");
        Ok(model)
    }

    pub async fn replace_director(&self, id: i32, name: String) -> AppResult<()> {
        let mut active = self.get_director(id).await?.into_active_model();
        active.name = Set(name);
        active.update(&self.db).await?;
        debug!(id, "director replaced");
        Ok(())
    }

    pub async fn patch_director(&self, id: i32, patch: &NamePatch) -> AppResult<()> {
        let mut active = self.get_director(id).await?.into_active_model();
        let Some(name) = patch.name() else {
            return Ok(());
        };
        active.name = Set(name.to_string());
        active.update(&self.db).await?;
        debug!(id, "director patched");
        Ok(())
    }

    /// Removes the director; movies pointing at it keep their `director_id`.
    pub async fn delete_director(&self, id: i32) -> AppResult<u64> {
        let res = director::Entity::delete_many()
            .filter(director::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        debug!(id, rows = res.rows_affected, "director deleted");
        Ok(res.rows_affected)
    }

    pub async fn list_genres(&self) -> AppResult<Vec<genre::Model>> {
        Ok(genre::Entity::find().order_by_asc(genre::Column::Id).all(&self.db).await?)
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<genre::Model> {
        let query = genre::Entity::find().filter(genre::Column::Id.eq(id));
        fetch_exactly_one(&self.db, query, "genre", id).await
    }

    pub async fn create_genre(&self, name: String) -> AppResult<genre::Model> {
        let model =
            genre::ActiveModel { name: Set(name), ..Default::default() }.insert(&self.db).await?;
        debug!(id = model.id, "genre created");
        Ok(model)
    }

    pub async fn replace_genre(&self, id: i32, name: String) -> AppResult<()> {
        let mut active = self.get_genre(id).await?.into_active_model();
        active.name = Set(name);
        active.update(&self.db).await?;
        debug!(id, "genre replaced");
        Ok(())
    }

    pub async fn patch_genre(&self, id: i32, patch: &NamePatch) -> AppResult<()> {
        let mut active = self.get_genre(id).await?.into_active_model();
        let Some(name) = patch.name() else {
            return Ok(());
        };
        active.name = Set(name.to_string());
        active.update(&self.db).await?;
        debug!(id, "genre patched");
        Ok(())
    }

    /// Removes the genre; movies pointing at it keep their `genre_id`.
    pub async fn delete_genre(&self, id: i32) -> AppResult<u64> {
        let res = genre::Entity::delete_many()
            .filter(genre::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        debug!(id, rows = res.rows_affected, "genre deleted");
        Ok(res.rows_affected)
    }
}

/// Strict lookup: exactly one row or an error saying which way it failed.
async fn fetch_exactly_one<E>(
    db: &DatabaseConnection,
    query: Select<E>,
    entity: &'static str,
    id: i32,
) -> AppResult<E::Model>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let mut rows = query.limit(2).all(db).await?;
    match rows.len() {
        0 => Err(AppError::NotFound { entity, id }),
        1 => Ok(rows.remove(0)),
        _ => Err(AppError::Ambiguous { entity, id }),
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    database::PostgresConnection,
    identities::domain::users::UserId,
    ledger::domain::categories::{
        Category, CategoryId, CategoryKind, NewCategoryData, SubCategory, SubCategoryId,
    },
    models,
};

pub type DynCategoryRepo = Arc<dyn CategoryRepo + Send + Sync>;

#[async_trait]
pub trait CategoryRepo {
    async fn insert_category(
        &self,
        user_id: UserId,
        category: &NewCategoryData,
    ) -> anyhow::Result<Category>;

    async fn get_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> anyhow::Result<Option<Category>>;

    /// List the user's categories along with their sub-categories.
    async fn list_categories(
        &self,
        user_id: UserId,
        kind: Option<CategoryKind>,
    ) -> anyhow::Result<Vec<Category>>;

    /// Delete a category and its sub-categories. Returns `false` if the user
    /// has no such category.
    async fn delete_category(&self, user_id: UserId, category_id: CategoryId)
        -> anyhow::Result<bool>;

    async fn insert_sub_category(
        &self,
        category_id: CategoryId,
        name: &str,
    ) -> anyhow::Result<SubCategory>;

    async fn delete_sub_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
        sub_category_id: SubCategoryId,
    ) -> anyhow::Result<bool>;
}

impl PostgresConnection {
    async fn sub_categories_of(
        &self,
        category_ids: &[CategoryId],
    ) -> anyhow::Result<Vec<models::ledger::SubCategory>> {
        Ok(sqlx::query_as::<_, models::ledger::SubCategory>(
            r#"
            SELECT *
            FROM sub_category
            WHERE category_id = ANY($1)
            ORDER BY name, id
            "#,
        )
        .bind(category_ids)
        .fetch_all(&**self)
        .await?)
    }
}

#[async_trait]
impl CategoryRepo for PostgresConnection {
    async fn insert_category(
        &self,
        user_id: UserId,
        category: &NewCategoryData,
    ) -> anyhow::Result<Category> {
        sqlx::query_as::<_, models::ledger::Category>(
            r#"
            INSERT INTO category (user_id, name, kind, color)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&category.name)
        .bind(category.kind.as_str())
        .bind(&category.color)
        .fetch_one(&**self)
        .await?
        .try_into_domain(Vec::new())
    }

    async fn get_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> anyhow::Result<Option<Category>> {
        let model = sqlx::query_as::<_, models::ledger::Category>(
            "SELECT * FROM category WHERE id = $1 AND user_id = $2",
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(&**self)
        .await?;

        match model {
            Some(model) => {
                let sub_categories = self.sub_categories_of(&[model.id]).await?;

                Ok(Some(model.try_into_domain(sub_categories)?))
            }
            None => Ok(None),
        }
    }

    async fn list_categories(
        &self,
        user_id: UserId,
        kind: Option<CategoryKind>,
    ) -> anyhow::Result<Vec<Category>> {
        let models = sqlx::query_as::<_, models::ledger::Category>(
            r#"
            SELECT *
            FROM category
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR kind = $2)
            ORDER BY name, id
            "#,
        )
        .bind(user_id)
        .bind(kind.map(|kind| kind.as_str()))
        .fetch_all(&**self)
        .await?;

        let category_ids = models.iter().map(|c| c.id).collect::<Vec<_>>();
        let sub_categories = self.sub_categories_of(&category_ids).await?;

        models
            .into_iter()
            .map(|model| {
                let id = model.id;

                model.try_into_domain(
                    sub_categories
                        .iter()
                        .filter(|sub_category| sub_category.category_id == id)
                        .cloned(),
                )
            })
            .collect()
    }

    async fn delete_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM category WHERE id = $1 AND user_id = $2")
            .bind(category_id)
            .bind(user_id)
            .execute(&**self)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_sub_category(
        &self,
        category_id: CategoryId,
        name: &str,
    ) -> anyhow::Result<SubCategory> {
        let model = sqlx::query_as::<_, models::ledger::SubCategory>(
            r#"
            INSERT INTO sub_category (category_id, name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(category_id)
        .bind(name)
        .fetch_one(&**self)
        .await?;

        Ok(model.into())
    }

    async fn delete_sub_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
        sub_category_id: SubCategoryId,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM sub_category s
            USING category c
            WHERE s.id = $1
                AND s.category_id = $2
                AND c.id = s.category_id
                AND c.user_id = $3
            "#,
        )
        .bind(sub_category_id)
        .bind(category_id)
        .bind(user_id)
        .execute(&**self)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

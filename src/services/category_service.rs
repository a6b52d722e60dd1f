use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::menu::{CategoryList, CategoryRequest, PatchCategoryRequest},
    entity::{
        categories::{ActiveModel, Column, Entity as Categories},
        menu_items::{Column as MenuCol, Entity as MenuItems},
    },
    error::{AppError, AppResult},
    models::Category,
    policy::{Action, Actor, authorize},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Slugs are lowercase ascii words joined by single hyphens.
pub fn validate_slug(slug: &str) -> AppResult<()> {
    let valid = !slug.is_empty()
        && slug.split('-').all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        });
    if valid {
        Ok(())
    } else {
        Err(AppError::bad_request(format!("Invalid slug '{slug}'")))
    }
}

fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    Ok(())
}

async fn ensure_slug_free(state: &AppState, slug: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Categories::find().filter(Column::Slug.eq(slug));
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::bad_request(format!("Slug '{slug}' is already taken")));
    }
    Ok(())
}

pub async fn list_categories(
    state: &AppState,
    actor: &Actor,
) -> AppResult<ApiResponse<CategoryList>> {
    authorize(actor, Action::ReadCatalog)?;
    let items: Vec<Category> = Categories::find()
        .order_by_asc(Column::Title)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    let meta = Meta::single_page(items.len());
    Ok(ApiResponse::success("Categories", CategoryList { items }, Some(meta)))
}

pub async fn get_category(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<ApiResponse<Category>> {
    authorize(actor, Action::ReadCatalog)?;
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Category", category.into(), None))
}

pub async fn create_category(
    state: &AppState,
    actor: &Actor,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    authorize(actor, Action::WriteCatalog)?;
    validate_slug(&payload.slug)?;
    validate_title(&payload.title)?;
    ensure_slug_free(state, &payload.slug, None).await?;

    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(payload.slug),
        title: Set(payload.title),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
    audit::record(
        state,
        actor.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category.into(),
        Some(Meta::empty()),
    ))
}

pub async fn replace_category(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    patch_category(
        state,
        actor,
        id,
        PatchCategoryRequest {
            slug: Some(payload.slug),
            title: Some(payload.title),
        },
    )
    .await
}

pub async fn patch_category(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    payload: PatchCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    authorize(actor, Action::PatchCatalog)?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(slug) = payload.slug {
        validate_slug(&slug)?;
        ensure_slug_free(state, &slug, Some(id)).await?;
        active.slug = Set(slug);
    }
    if let Some(title) = payload.title {
        validate_title(&title)?;
        active.title = Set(title);
    }
    let category = active.update(&state.orm).await?;

    audit::record(
        state,
        actor.user_id,
        "category_update",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        category.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(state: &AppState, actor: &Actor, id: Uuid) -> AppResult<()> {
    authorize(actor, Action::WriteCatalog)?;
    if Categories::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let in_use = MenuItems::find()
        .filter(MenuCol::CategoryId.eq(id))
        .count(&state.orm)
        .await?;
    if in_use > 0 {
        return Err(AppError::bad_request(format!(
            "Category is used by {in_use} menu item(s)"
        )));
    }

    Categories::delete_by_id(id).exec(&state.orm).await?;
    tracing::info!(category_id = %id, "category deleted");
    audit::record(
        state,
        actor.user_id,
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_must_be_url_safe() {
        assert!(validate_slug("main-courses").is_ok());
        assert!(validate_slug("desserts2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Main").is_err());
        assert!(validate_slug("main courses").is_err());
        assert!(validate_slug("-main").is_err());
        assert!(validate_slug("main--course").is_err());
    }
}

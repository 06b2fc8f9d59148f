use crate::{
    auth::{AccessAuthority, AuthenticatedUser},
    error::AppError,
    models::{Task, TaskInput, TaskQuery},
    store::{StoreError, TaskStore},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Fetches a task and checks that the caller owns it.
///
/// A task owned by someone else yields the same error as a missing one.
async fn fetch_owned_task(
    authority: &AccessAuthority,
    tasks: &dyn TaskStore,
    user: &AuthenticatedUser,
    task_id: Uuid,
) -> Result<Task, AppError> {
    let task = tasks.find_by_id(task_id).await?.ok_or_else(task_not_found)?;

    if let Err(denied) = authority.authorize_ownership(&user.0, &task.owner_id) {
        log::debug!("user {} denied task {}: {}", user.0.id, task_id, denied);
        return Err(task_not_found());
    }
    Ok(task)
}

/// Retrieves a list of tasks for the authenticated user.
///
/// ## Query Parameters:
/// - `status` (optional): `pending`, `in_progress` or `completed`.
/// - `priority` (optional): `low`, `medium` or `high`.
/// - `due_after` / `due_before` (optional): RFC 3339 bounds on the deadline.
/// - `overdue` (optional): `true` to keep only tasks whose deadline has passed.
/// - `search` (optional): Case-insensitive match in name and description.
/// - `sort` (optional): `created` (newest first, default) or `deadline` (earliest first).
///
/// ## Responses:
/// - `200 OK`: A JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid session token.
#[get("")]
pub async fn get_tasks(
    tasks: web::Data<dyn TaskStore>,
    query_params: web::Query<TaskQuery>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let listed = tasks
        .list_for_owner(&user.0.id, &query_params, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(listed))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: The newly created `Task`.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `422 Unprocessable Entity`: If `TaskInput` validation fails.
#[post("")]
pub async fn create_task(
    tasks: web::Data<dyn TaskStore>,
    task_data: web::Json<TaskInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), &user.0.id);
    let created = tasks.insert(task).await?;

    log::info!("user {} created task {}", user.0.id, created.id);
    Ok(HttpResponse::Created().json(created))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: The `Task`.
/// - `404 Not Found`: The task does not exist or is not owned by the caller.
#[get("/{id}")]
pub async fn get_task(
    authority: web::Data<AccessAuthority>,
    tasks: web::Data<dyn TaskStore>,
    task_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = fetch_owned_task(&authority, tasks.get_ref(), &user, task_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Updates an existing task the caller owns. The owner never changes.
///
/// ## Responses:
/// - `200 OK`: The updated `Task`.
/// - `404 Not Found`: The task does not exist or is not owned by the caller.
/// - `422 Unprocessable Entity`: If `TaskInput` validation fails.
#[put("/{id}")]
pub async fn update_task(
    authority: web::Data<AccessAuthority>,
    tasks: web::Data<dyn TaskStore>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let mut task =
        fetch_owned_task(&authority, tasks.get_ref(), &user, task_id.into_inner()).await?;
    task.apply(task_data.into_inner());

    let updated = tasks.update(task).await.map_err(|e| match e {
        StoreError::NotFound => task_not_found(),
        other => other.into(),
    })?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task the caller owns.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: The task does not exist or is not owned by the caller.
#[delete("/{id}")]
pub async fn delete_task(
    authority: web::Data<AccessAuthority>,
    tasks: web::Data<dyn TaskStore>,
    task_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = fetch_owned_task(&authority, tasks.get_ref(), &user, task_id.into_inner()).await?;

    tasks.delete(task.id).await.map_err(|e| match e {
        StoreError::NotFound => task_not_found(),
        other => other.into(),
    })?;

    log::info!("user {} deleted task {}", user.0.id, task.id);
    Ok(HttpResponse::NoContent().finish())
}

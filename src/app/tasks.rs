//! Background repository calls.
//!
//! Each call runs in its own tokio task, wrapped in [`catch_task_panic`],
//! and reports back to the event loop over the `AppEvent` channel.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::AppEvent;
use crate::api::{CategoryId, CategoryPayload, CategoryRepository};
use crate::form::FormMode;

pub const LOAD_TASK: &str = "category_load";
pub const SAVE_TASK: &str = "category_save";
pub const DELETE_TASK: &str = "category_delete";

/// Wraps a future to catch panics and convert them to errors.
///
/// A panicking background task would otherwise vanish inside the runtime
/// and leave the UI waiting forever. The panic payload becomes `Err(msg)`.
pub async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

async fn send(tx: &mpsc::Sender<AppEvent>, event: AppEvent, name: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

async fn report_panic(
    tx: &mpsc::Sender<AppEvent>,
    task: &'static str,
    generation: Option<u64>,
    error: String,
) {
    tracing::error!(task, ?generation, error = %error, "Background task panicked");
    send(
        tx,
        AppEvent::TaskPanicked {
            task,
            generation,
            error,
        },
        "TaskPanicked",
    )
    .await;
}

pub(super) fn spawn_load(
    repo: Arc<dyn CategoryRepository>,
    generation: u64,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match catch_task_panic(repo.list_all()).await {
            Ok(result) => {
                send(
                    &tx,
                    AppEvent::CategoriesLoaded { generation, result },
                    "CategoriesLoaded",
                )
                .await
            }
            Err(panic_msg) => report_panic(&tx, LOAD_TASK, Some(generation), panic_msg).await,
        }
    })
}

pub(super) fn spawn_save(
    repo: Arc<dyn CategoryRepository>,
    mode: FormMode,
    payload: CategoryPayload,
    generation: u64,
    tx: mpsc::Sender<AppEvent>,
) {
    tokio::spawn(async move {
        let created = mode == FormMode::Create;
        let name = payload.name.clone();
        let call = async {
            match &mode {
                FormMode::Create => repo.create(&payload).await,
                FormMode::Edit { id } => repo.update(id, &payload).await,
            }
        };
        match catch_task_panic(call).await {
            Ok(result) => {
                send(
                    &tx,
                    AppEvent::CategorySaved {
                        generation,
                        created,
                        name,
                        result,
                    },
                    "CategorySaved",
                )
                .await
            }
            Err(panic_msg) => report_panic(&tx, SAVE_TASK, Some(generation), panic_msg).await,
        }
    });
}

pub(super) fn spawn_delete(
    repo: Arc<dyn CategoryRepository>,
    id: CategoryId,
    name: String,
    tx: mpsc::Sender<AppEvent>,
) {
    tokio::spawn(async move {
        match catch_task_panic(repo.delete(&id)).await {
            Ok(result) => {
                send(
                    &tx,
                    AppEvent::CategoryDeleted { id, name, result },
                    "CategoryDeleted",
                )
                .await
            }
            Err(panic_msg) => report_panic(&tx, DELETE_TASK, None, panic_msg).await,
        }
    });
}

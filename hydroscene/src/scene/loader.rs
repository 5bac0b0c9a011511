//! Scene data loader abstraction.
//!
//! Entering a scene runs its side-effect initializer: the loader fetches
//! whatever the scene needs (layer configuration, station lists, initial
//! camera) from collaborating services. Loads can be slow, so the
//! coordinator runs them under a timeout and rolls back on failure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use super::types::{LayerVisibility, Scene, SceneId, Viewport};

/// Data a scene needs before it can be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneContext {
    /// Scene the context was loaded for.
    pub scene: SceneId,
    /// Layer visibility to push to displays.
    pub layers: Vec<LayerVisibility>,
    /// Initial camera, if the loader has an opinion.
    pub viewport: Option<Viewport>,
}

/// Scene loader errors.
#[derive(Debug, Clone, Error)]
pub enum LoaderError {
    /// The collaborating service could not be reached.
    #[error("scene data service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with unusable data.
    #[error("invalid scene data: {0}")]
    InvalidData(String),
}

/// Boxed future returned by [`SceneContextLoader::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<SceneContext, LoaderError>> + Send + 'a>>;

/// Loads the context for a scene that is about to be entered.
///
/// Implementations must be `Send + Sync` so the coordinator can hold them
/// behind an `Arc<dyn SceneContextLoader>`.
pub trait SceneContextLoader: Send + Sync + 'static {
    /// Load the context for `scene`.
    fn load<'a>(&'a self, scene: &'static Scene) -> LoadFuture<'a>;
}

/// Shared loader handle.
pub type SharedLoader = Arc<dyn SceneContextLoader>;

/// Loader that answers from the scene registry's defaults.
///
/// Used when no external scene data service is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticSceneLoader {
    viewport: Option<Viewport>,
}

impl StaticSceneLoader {
    /// Create a loader with no preferred viewport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this viewport for every scene.
    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            viewport: Some(viewport),
        }
    }
}

impl SceneContextLoader for StaticSceneLoader {
    fn load<'a>(&'a self, scene: &'static Scene) -> LoadFuture<'a> {
        let context = SceneContext {
            scene: scene.id,
            layers: scene.layers(),
            viewport: self.viewport,
        };
        Box::pin(async move { Ok(context) })
    }
}

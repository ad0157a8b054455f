//! Preview rendering
//!
//! Pixels come from a [`Rasterizer`] supplied by the host (in the browser
//! that is PDF.js). This module checks what goes in and out of it and,
//! with the `async` feature, schedules many pages at once.

use crate::config::RenderConfig;
use crate::error::{EditError, Result};
use crate::geometry::Size;

/// RGBA pixels, row-major, four bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(EditError::RenderFailure(format!(
                "{}x{} bitmap needs {} bytes, got {}",
                width,
                height,
                expected,
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}

/// Turns pages of an opened document into bitmaps.
pub trait Rasterizer {
    type Source;

    fn page_count(&self, source: &Self::Source) -> usize;

    /// Page size in points as displayed, native rotation applied.
    fn displayed_size(&self, source: &Self::Source, index: usize) -> Result<Size>;

    /// Must be deterministic for the same inputs.
    fn rasterize(&self, source: &Self::Source, index: usize, scale: f64) -> Result<Bitmap>;
}

/// A rendered page plus what is needed to map selections drawn on it
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPage {
    pub original_index: usize,
    pub bitmap: Bitmap,
    /// Displayed page size in points
    pub page_size: Size,
}

impl PreviewPage {
    pub fn render_width(&self) -> u32 {
        self.bitmap.width
    }

    pub fn render_height(&self) -> u32 {
        self.bitmap.height
    }

    /// Preview pixels per page point along the preview's x axis.
    ///
    /// Measured against the displayed size, which is the native size for
    /// unrotated pages and its transpose for quarter-turned ones.
    pub fn scale_x(&self) -> f64 {
        self.bitmap.width as f64 / self.page_size.width
    }

    /// Preview pixels per page point along the preview's y axis.
    pub fn scale_y(&self) -> f64 {
        self.bitmap.height as f64 / self.page_size.height
    }
}

pub struct PreviewRenderer<R> {
    rasterizer: R,
    default_scale: f64,
}

impl<R: Rasterizer> PreviewRenderer<R> {
    pub fn new(rasterizer: R, default_scale: f64) -> Self {
        Self {
            rasterizer,
            default_scale,
        }
    }

    pub fn from_config(rasterizer: R, config: &RenderConfig) -> Self {
        Self::new(rasterizer, config.default_scale)
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Render one page. `scale` falls back to the configured default.
    pub fn render(
        &self,
        source: &R::Source,
        index: usize,
        scale: Option<f64>,
    ) -> Result<PreviewPage> {
        let page_count = self.rasterizer.page_count(source);
        if index >= page_count {
            return Err(EditError::PageOutOfRange { index, page_count });
        }
        let scale = scale.unwrap_or(self.default_scale);
        if !(scale.is_finite() && scale > 0.0) {
            return Err(EditError::RenderFailure(format!(
                "scale must be positive, got {}",
                scale
            )));
        }

        let page_size = self.rasterizer.displayed_size(source, index)?;
        let bitmap = self.rasterizer.rasterize(source, index, scale)?;
        // Re-check: rasterizers are outside code.
        let bitmap = Bitmap::new(bitmap.width, bitmap.height, bitmap.rgba)?;
        Ok(PreviewPage {
            original_index: index,
            bitmap,
            page_size,
        })
    }
}

#[cfg(feature = "async")]
pub use pool::RenderPool;

#[cfg(feature = "async")]
mod pool {
    use super::{PreviewPage, PreviewRenderer, Rasterizer};
    use crate::config::RenderConfig;
    use crate::engine::Epoch;
    use crate::error::{EditError, Result};
    use std::sync::Arc;
    use tokio::sync::Semaphore;
    use tokio::task::JoinSet;
    use tracing::{debug, instrument, warn};

    /// Renders many pages at once, at most `max_concurrent` at a time.
    ///
    /// Every batch remembers the epoch it started in. When the epoch moves
    /// on (a new document was loaded, or the engine was reset) the batch
    /// fails with [`EditError::Stale`] instead of returning bitmaps for a
    /// document that is gone.
    pub struct RenderPool<R> {
        renderer: Arc<PreviewRenderer<R>>,
        permits: Arc<Semaphore>,
        epoch: Epoch,
    }

    impl<R> RenderPool<R>
    where
        R: Rasterizer + Send + Sync + 'static,
        R::Source: Send + Sync + 'static,
    {
        pub fn new(renderer: PreviewRenderer<R>, max_concurrent: usize, epoch: Epoch) -> Self {
            Self {
                renderer: Arc::new(renderer),
                permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
                epoch,
            }
        }

        /// Pool sized by `render.max_concurrent`, sharing the engine's epoch.
        pub fn from_config(rasterizer: R, config: &RenderConfig, epoch: Epoch) -> Self {
            Self::new(
                PreviewRenderer::from_config(rasterizer, config),
                config.max_concurrent,
                epoch,
            )
        }

        /// Render `indices`, returning previews in the same order.
        ///
        /// The first failure aborts the pages still waiting.
        #[instrument(skip_all, fields(pages = indices.len()))]
        pub async fn render_pages(
            &self,
            source: Arc<R::Source>,
            indices: &[usize],
            scale: Option<f64>,
        ) -> Result<Vec<PreviewPage>> {
            let started = self.epoch.current();
            let mut tasks = JoinSet::new();

            for (slot, &index) in indices.iter().enumerate() {
                let renderer = Arc::clone(&self.renderer);
                let permits = Arc::clone(&self.permits);
                let source = Arc::clone(&source);
                let epoch = self.epoch.clone();
                tasks.spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| EditError::RenderFailure("render pool closed".into()))?;
                    // Don't start work for a session that is already gone.
                    epoch.check(started)?;
                    let page = tokio::task::spawn_blocking(move || {
                        renderer.render(&source, index, scale)
                    })
                    .await
                    .map_err(|e| EditError::RenderFailure(format!("render task failed: {}", e)))??;
                    Ok::<_, EditError>((slot, page))
                });
            }

            let mut pages: Vec<Option<PreviewPage>> = vec![None; indices.len()];
            while let Some(joined) = tasks.join_next().await {
                let (slot, page) = joined
                    .map_err(|e| EditError::RenderFailure(format!("render task failed: {}", e)))??;
                debug!(page = page.original_index, "preview rendered");
                pages[slot] = Some(page);
            }

            if let Err(stale) = self.epoch.check(started) {
                warn!(started, current = self.epoch.current(), "discarding stale previews");
                return Err(stale);
            }
            Ok(pages.into_iter().flatten().collect())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Solid-gray pages of the given sizes, `scale` pixels per point.
    pub struct FakeRasterizer;

    impl Rasterizer for FakeRasterizer {
        type Source = Vec<Size>;

        fn page_count(&self, source: &Vec<Size>) -> usize {
            source.len()
        }

        fn displayed_size(&self, source: &Vec<Size>, index: usize) -> Result<Size> {
            source
                .get(index)
                .copied()
                .ok_or(EditError::RenderFailure("no such page".into()))
        }

        fn rasterize(&self, source: &Vec<Size>, index: usize, scale: f64) -> Result<Bitmap> {
            let size = self.displayed_size(source, index)?;
            let width = (size.width * scale).round() as u32;
            let height = (size.height * scale).round() as u32;
            Bitmap::new(width, height, vec![128; width as usize * height as usize * 4])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeRasterizer;
    use super::*;

    fn pages() -> Vec<Size> {
        vec![Size::new(200.0, 400.0), Size::new(100.0, 50.0)]
    }

    #[test]
    fn test_render_reports_dimensions_and_scale() {
        let renderer = PreviewRenderer::new(FakeRasterizer, 1.0);
        let preview = renderer.render(&pages(), 0, Some(2.0)).unwrap();
        assert_eq!(preview.render_width(), 400);
        assert_eq!(preview.render_height(), 800);
        assert_eq!(preview.scale_x(), 2.0);
        assert_eq!(preview.scale_y(), 2.0);

        let preview = renderer.render(&pages(), 1, Some(1.5)).unwrap();
        assert_eq!(preview.render_width(), 150);
        assert_eq!(preview.scale_x(), 1.5);
        assert_eq!(preview.scale_y(), 1.5);
    }

    #[test]
    fn test_render_uses_default_scale() {
        let renderer = PreviewRenderer::from_config(FakeRasterizer, &RenderConfig::default());
        let preview = renderer.render(&pages(), 1, None).unwrap();
        assert_eq!(preview.render_width(), 150);
        assert_eq!(preview.render_height(), 75);
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = PreviewRenderer::new(FakeRasterizer, 1.0);
        let a = renderer.render(&pages(), 1, Some(1.25)).unwrap();
        let b = renderer.render(&pages(), 1, Some(1.25)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_rejects_bad_input() {
        let renderer = PreviewRenderer::new(FakeRasterizer, 1.0);
        assert!(matches!(
            renderer.render(&pages(), 2, None),
            Err(EditError::PageOutOfRange { index: 2, page_count: 2 })
        ));
        assert!(matches!(
            renderer.render(&pages(), 0, Some(0.0)),
            Err(EditError::RenderFailure(_))
        ));
        assert!(renderer.render(&pages(), 0, Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_bitmap_checks_buffer_length() {
        assert!(Bitmap::new(2, 2, vec![0; 16]).is_ok());
        assert!(Bitmap::new(2, 2, vec![0; 15]).is_err());
        assert!(Bitmap::new(0, 2, vec![]).is_err());
    }

    #[cfg(feature = "async")]
    mod pool {
        use super::*;
        use crate::engine::Epoch;
        use std::sync::Arc;

        #[tokio::test]
        async fn test_pool_keeps_request_order() {
            let pool = RenderPool::new(PreviewRenderer::new(FakeRasterizer, 1.0), 2, Epoch::default());
            let source = Arc::new(vec![
                Size::new(10.0, 10.0),
                Size::new(20.0, 10.0),
                Size::new(30.0, 10.0),
            ]);
            let previews = pool.render_pages(source, &[2, 0, 1], None).await.unwrap();
            let widths: Vec<u32> = previews.iter().map(|p| p.render_width()).collect();
            assert_eq!(widths, vec![30, 10, 20]);
        }

        #[tokio::test]
        async fn test_pool_from_config() {
            let config = RenderConfig {
                max_concurrent: 1,
                default_scale: 2.0,
            };
            let pool = RenderPool::from_config(FakeRasterizer, &config, Epoch::default());
            let previews = pool
                .render_pages(Arc::new(pages()), &[0, 1], None)
                .await
                .unwrap();
            assert_eq!(previews[0].render_width(), 400);
            assert_eq!(previews[1].render_height(), 100);
        }

        /// Simulates the user loading another document mid-render.
        struct ReloadingRasterizer {
            epoch: Epoch,
        }

        impl Rasterizer for ReloadingRasterizer {
            type Source = Vec<Size>;

            fn page_count(&self, source: &Vec<Size>) -> usize {
                source.len()
            }

            fn displayed_size(&self, source: &Vec<Size>, index: usize) -> Result<Size> {
                FakeRasterizer.displayed_size(source, index)
            }

            fn rasterize(&self, source: &Vec<Size>, index: usize, scale: f64) -> Result<Bitmap> {
                self.epoch.advance();
                FakeRasterizer.rasterize(source, index, scale)
            }
        }

        #[tokio::test]
        async fn test_pool_reports_stale_epoch() {
            let epoch = Epoch::default();
            let source = Arc::new(vec![Size::new(10.0, 10.0); 4]);

            let pool = RenderPool::new(PreviewRenderer::new(FakeRasterizer, 1.0), 1, epoch.clone());
            epoch.advance();
            let fresh = pool.render_pages(Arc::clone(&source), &[0, 1], None).await;
            assert_eq!(fresh.unwrap().len(), 2);

            let rasterizer = ReloadingRasterizer {
                epoch: epoch.clone(),
            };
            let pool = RenderPool::new(PreviewRenderer::new(rasterizer, 1.0), 1, epoch);
            let err = pool.render_pages(source, &[0, 1, 2, 3], None).await.unwrap_err();
            assert!(matches!(err, EditError::Stale { .. }));
        }

        #[tokio::test]
        async fn test_pool_propagates_render_errors() {
            let pool = RenderPool::new(PreviewRenderer::new(FakeRasterizer, 1.0), 4, Epoch::default());
            let source = Arc::new(vec![Size::new(10.0, 10.0)]);
            let err = pool.render_pages(source, &[0, 5], None).await.unwrap_err();
            assert!(matches!(err, EditError::PageOutOfRange { index: 5, .. }));
        }
    }
}

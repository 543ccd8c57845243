//! 交换链生命周期
//!
//! 状态只在显式事件上变化（`sync` 调用与失败通知），从不依赖时间：
//!
//! - **去抖**: 新尺寸需要连续 `min_stable_frames_before_resize` 次 sync 保持不变才会 resize；
//!   存在上一次失败锁定的同一尺寸、或者 acquire / present 失败尚未恢复时跳过去抖
//! - **退避**: 原地 resize 失败后锁定失败的尺寸，冷却帧数每次失败翻倍，直到上限
//! - **重建**: 后端不支持原地 resize 时释放并重新创建交换链
//! - **不可用**: 重建或者 render target 重新分配失败后报告 `Invalid`，同样按退避节奏重试
//! - **延迟释放**: 每次 sync 开头推进一次延迟释放计数

use std::fmt;

use prism_gfx::basic::native::GfxExtent2D;
use prism_gfx::error::GfxSurfaceError;
use prism_gfx::swapchain::render_swapchain::GfxSwapchain;
use prism_render_interface::resource_manager::ResourceManager;

use crate::config::SwapchainLifecycleConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SwapchainLifecycleState {
    #[default]
    Uninitialized,
    Ready,
    /// acquire / present 失败之后，等待下一次 sync 重新 resize
    ResizePending,
    /// 原地 resize 失败，正在冷却
    ResizeDeferred,
    /// 正在释放并重新创建交换链
    Recovering,
    Minimized,
    /// 没有可用的交换链 image
    Invalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceSyncStatus {
    Ready,
    Resized,
    DeferredRetry,
    Minimized,
    Invalid,
}

impl SurfaceSyncStatus {
    /// 本次 tick 是否可以执行 render graph
    #[inline]
    pub fn can_render(&self) -> bool {
        matches!(self, SurfaceSyncStatus::Ready | SurfaceSyncStatus::Resized)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSyncResult {
    pub status: SurfaceSyncStatus,
    pub render_width: u32,
    pub render_height: u32,
    pub state: SwapchainLifecycleState,
}

impl SurfaceSyncResult {
    #[inline]
    pub fn render_extent(&self) -> GfxExtent2D {
        GfxExtent2D::new(self.render_width, self.render_height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceFailureKind {
    Acquire,
    Present,
}

impl fmt::Display for SurfaceFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceFailureKind::Acquire => write!(f, "acquire"),
            SurfaceFailureKind::Present => write!(f, "present"),
        }
    }
}

/// 持续失败的计数器，只在第一次和每 `period` 次时记录日志
#[derive(Clone, Copy, Debug, Default)]
pub struct FailureCounter {
    count: u64,
}

impl FailureCounter {
    /// 返回这一次是否记录了日志
    pub fn record(&mut self, period: u32, what: impl fmt::Display, reason: impl fmt::Display) -> bool {
        self.count += 1;
        let should_log = self.count == 1 || self.count % u64::from(period.max(1)) == 0;
        if should_log {
            log::warn!("{} failed ({} times): {}", what, self.count, reason);
        }
        should_log
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// 一次 sync 需要访问的对象
pub struct SurfaceSyncContext<'a> {
    pub swapchain: &'a mut dyn GfxSwapchain,
    pub resource_manager: &'a mut ResourceManager,
    /// 当前帧最后一次提交的 fence，resize 前会等待它
    pub frame_fence: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResizeOutcome {
    NoOp,
    /// 尺寸还没有稳定下来
    Debouncing,
    /// 冷却中，本次不尝试
    CoolingDown,
    Resized,
    Deferred,
    Failed,
}

pub struct SwapchainLifecycle {
    config: SwapchainLifecycleConfig,
    state: SwapchainLifecycleState,

    /// 最后一次成功应用的尺寸；失败通知会清空它，迫使下一次 sync 重新 resize
    applied_extent: Option<GfxExtent2D>,

    /// 去抖：观察到的尺寸和连续观察到的次数
    observed_extent: Option<GfxExtent2D>,
    stable_frames: u32,

    /// 退避：锁定的失败尺寸、连续失败次数以及剩余的冷却帧数
    failed_extent: Option<GfxExtent2D>,
    resize_failures: u32,
    retry_cooldown: u32,

    acquire_failures: FailureCounter,
    present_failures: FailureCounter,
    resize_failure_log: FailureCounter,
    surface_failure_active: bool,
}

// new & init
impl SwapchainLifecycle {
    pub fn new(config: SwapchainLifecycleConfig) -> Self {
        Self {
            config,
            state: SwapchainLifecycleState::Uninitialized,
            applied_extent: None,
            observed_extent: None,
            stable_frames: 0,
            failed_extent: None,
            resize_failures: 0,
            retry_cooldown: 0,
            acquire_failures: FailureCounter::default(),
            present_failures: FailureCounter::default(),
            resize_failure_log: FailureCounter::default(),
            surface_failure_active: false,
        }
    }

    /// 为交换链当前的 images 建立包装，进入 `Ready`
    pub fn initialize(&mut self, swapchain: &dyn GfxSwapchain, resource_manager: &mut ResourceManager) {
        match resource_manager.rebuild_swapchain_targets(swapchain) {
            Ok(()) => {
                self.applied_extent = Some(swapchain.extent());
                self.state = SwapchainLifecycleState::Ready;
            }
            Err(err) => {
                log::error!("failed to wrap swapchain images: {}", err);
                self.state = SwapchainLifecycleState::Invalid;
            }
        }
    }
}
// getters
impl SwapchainLifecycle {
    #[inline]
    pub fn state(&self) -> SwapchainLifecycleState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &SwapchainLifecycleConfig {
        &self.config
    }

    #[inline]
    pub fn resize_failures(&self) -> u32 {
        self.resize_failures
    }

    #[inline]
    pub fn retry_cooldown(&self) -> u32 {
        self.retry_cooldown
    }

    #[inline]
    pub fn failed_extent(&self) -> Option<GfxExtent2D> {
        self.failed_extent
    }

    #[inline]
    pub fn acquire_failure_count(&self) -> u64 {
        self.acquire_failures.count()
    }

    #[inline]
    pub fn present_failure_count(&self) -> u64 {
        self.present_failures.count()
    }
}
// update
impl SwapchainLifecycle {
    pub fn sync(&mut self, width: u32, height: u32, ctx: SurfaceSyncContext<'_>) -> SurfaceSyncResult {
        let _span = prism_crate_tools::profile_span!("SwapchainLifecycle::sync");
        let SurfaceSyncContext {
            swapchain,
            resource_manager,
            frame_fence,
        } = ctx;

        resource_manager.advance_deferred_release();

        if width == 0 || height == 0 {
            if self.state != SwapchainLifecycleState::Minimized {
                log::info!("window minimized, stop rendering");
            }
            self.state = SwapchainLifecycleState::Minimized;
            return self.result(SurfaceSyncStatus::Minimized, swapchain);
        }

        let requested = GfxExtent2D::new(width, height);
        let outcome = self.resize_if_needed(requested, swapchain, resource_manager, frame_fence);
        log::trace!("sync {}x{}: {:?}", width, height, outcome);

        // 没有已应用的尺寸时交换链和 render target 不一致，直到下一次 resize 成功
        let surface_stale = self.applied_extent.is_none() && self.state != SwapchainLifecycleState::ResizeDeferred;
        if outcome == ResizeOutcome::Failed || surface_stale || !resource_manager.has_swapchain_targets() {
            self.state = SwapchainLifecycleState::Invalid;
            return self.result(SurfaceSyncStatus::Invalid, swapchain);
        }
        if self.state == SwapchainLifecycleState::ResizeDeferred {
            return self.result(SurfaceSyncStatus::DeferredRetry, swapchain);
        }

        self.acquire_failures.reset();
        self.present_failures.reset();
        self.surface_failure_active = false;
        self.state = SwapchainLifecycleState::Ready;

        let status = if outcome == ResizeOutcome::Resized {
            SurfaceSyncStatus::Resized
        } else {
            SurfaceSyncStatus::Ready
        };
        self.result(status, swapchain)
    }

    /// acquire / present 失败
    ///
    /// 清空已应用的尺寸并取消冷却，下一次 sync 会立即尝试 resize。
    pub fn notify_surface_failure(&mut self, kind: SurfaceFailureKind, error: GfxSurfaceError) {
        let period = self.config.failure_log_period;
        match kind {
            SurfaceFailureKind::Acquire => self.acquire_failures.record(period, kind, error),
            SurfaceFailureKind::Present => self.present_failures.record(period, kind, error),
        };

        self.surface_failure_active = true;
        self.applied_extent = None;
        self.retry_cooldown = 0;
        self.state = SwapchainLifecycleState::ResizePending;
    }

    fn resize_if_needed(
        &mut self,
        requested: GfxExtent2D,
        swapchain: &mut dyn GfxSwapchain,
        resource_manager: &mut ResourceManager,
        frame_fence: u64,
    ) -> ResizeOutcome {
        if self.applied_extent == Some(requested) {
            self.reset_retry();
            if self.state == SwapchainLifecycleState::ResizeDeferred {
                self.state = SwapchainLifecycleState::Ready;
            }
            return ResizeOutcome::NoOp;
        }

        let retrying_latched = self.failed_extent == Some(requested);
        if !retrying_latched && !self.surface_failure_active {
            if self.observed_extent == Some(requested) {
                self.stable_frames = self.stable_frames.saturating_add(1);
            } else {
                self.observed_extent = Some(requested);
                self.stable_frames = 1;
            }
            if self.stable_frames < self.config.min_stable_frames_before_resize {
                return ResizeOutcome::Debouncing;
            }
        }

        if retrying_latched && self.retry_cooldown > 0 {
            self.retry_cooldown -= 1;
            return ResizeOutcome::CoolingDown;
        }
        if !retrying_latched {
            self.resize_failures = 0;
        }

        self.attempt_resize(requested, swapchain, resource_manager, frame_fence)
    }

    fn attempt_resize(
        &mut self,
        requested: GfxExtent2D,
        swapchain: &mut dyn GfxSwapchain,
        resource_manager: &mut ResourceManager,
        frame_fence: u64,
    ) -> ResizeOutcome {
        let _span = prism_crate_tools::profile_span!("SwapchainLifecycle::resize");
        log::info!(
            "resize swapchain: {}x{} -> {}x{}",
            swapchain.width(),
            swapchain.height(),
            requested.width,
            requested.height
        );

        let device = resource_manager.device().clone();
        device.wait_for_fence(frame_fence);
        device.wait_idle();
        resource_manager.flush_deferred_release();
        resource_manager.stash_swapchain_targets();

        if swapchain.resize(requested.width, requested.height) {
            return self.finish_resize(requested, swapchain, resource_manager);
        }

        if swapchain.supports_in_place_resize() {
            self.record_resize_failure(requested, "in-place resize was rejected");
            if let Err(err) = resource_manager.restore_swapchain_targets(swapchain) {
                log::error!("failed to restore swapchain images: {}", err);
                self.applied_extent = None;
                self.state = SwapchainLifecycleState::Invalid;
                return ResizeOutcome::Failed;
            }
            self.state = SwapchainLifecycleState::ResizeDeferred;
            return ResizeOutcome::Deferred;
        }

        self.state = SwapchainLifecycleState::Recovering;
        resource_manager.release_swapchain_targets();
        swapchain.release();
        match swapchain.recreate(requested.width, requested.height) {
            Ok(()) => self.finish_resize(requested, swapchain, resource_manager),
            Err(err) => self.fail_resize(requested, err),
        }
    }

    fn finish_resize(
        &mut self,
        requested: GfxExtent2D,
        swapchain: &mut dyn GfxSwapchain,
        resource_manager: &mut ResourceManager,
    ) -> ResizeOutcome {
        if let Err(err) = resource_manager.rebuild_swapchain_targets(swapchain) {
            return self.fail_resize(requested, format_args!("failed to wrap swapchain images: {}", err));
        }
        match resource_manager.resize_window_relative_targets(swapchain.extent()) {
            Ok(count) if count > 0 => log::info!("reallocated {} window-relative render targets", count),
            Ok(_) => {}
            Err(err) => {
                return self.fail_resize(
                    requested,
                    format_args!("failed to reallocate window-relative render targets: {}", err),
                );
            }
        }

        self.applied_extent = Some(requested);
        self.reset_retry();
        self.state = SwapchainLifecycleState::Ready;
        ResizeOutcome::Resized
    }
}
// tools
impl SwapchainLifecycle {
    /// 交换链已经不可用：清空已应用的尺寸，按退避节奏重试
    fn fail_resize(&mut self, requested: GfxExtent2D, reason: impl fmt::Display) -> ResizeOutcome {
        self.record_resize_failure(requested, reason);
        self.applied_extent = None;
        self.state = SwapchainLifecycleState::Invalid;
        ResizeOutcome::Failed
    }

    fn record_resize_failure(&mut self, requested: GfxExtent2D, reason: impl fmt::Display) {
        self.resize_failures = self.resize_failures.saturating_add(1);
        self.retry_cooldown = self.config.retry_cooldown(self.resize_failures);
        self.failed_extent = Some(requested);
        self.resize_failure_log.record(
            self.config.failure_log_period,
            format_args!("resize to {}x{}", requested.width, requested.height),
            format_args!("{}, retry in {} frames", reason, self.retry_cooldown),
        );
    }

    fn reset_retry(&mut self) {
        self.failed_extent = None;
        self.resize_failures = 0;
        self.retry_cooldown = 0;
        self.observed_extent = None;
        self.stable_frames = 0;
        self.resize_failure_log.reset();
    }

    fn result(&self, status: SurfaceSyncStatus, swapchain: &dyn GfxSwapchain) -> SurfaceSyncResult {
        SurfaceSyncResult {
            status,
            render_width: swapchain.width(),
            render_height: swapchain.height(),
            state: self.state,
        }
    }
}

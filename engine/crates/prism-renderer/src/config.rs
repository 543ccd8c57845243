use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use prism_gfx::foundation::device::GfxBackendKind;

/// headless 后端模拟的后端类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmulatedBackend {
    #[default]
    Vulkan,
    D3d12,
}

impl From<EmulatedBackend> for GfxBackendKind {
    fn from(value: EmulatedBackend) -> Self {
        match value {
            EmulatedBackend::Vulkan => GfxBackendKind::Vulkan,
            EmulatedBackend::D3d12 => GfxBackendKind::D3d12,
        }
    }
}

/// 交换链生命周期的参数
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapchainLifecycleConfig {
    /// 请求的尺寸需要连续观察到多少次 sync 才会真正 resize
    pub min_stable_frames_before_resize: u32,
    /// 第一次 resize 失败后跳过的 sync 次数
    pub retry_cooldown_base_frames: u32,
    pub retry_cooldown_max_frames: u32,
    /// 持续失败时每隔多少次记录一条日志
    pub failure_log_period: u32,
}

impl Default for SwapchainLifecycleConfig {
    fn default() -> Self {
        Self {
            min_stable_frames_before_resize: 3,
            retry_cooldown_base_frames: 2,
            retry_cooldown_max_frames: 60,
            failure_log_period: 120,
        }
    }
}

impl SwapchainLifecycleConfig {
    /// 连续失败 `consecutive_failures` 次之后的冷却帧数
    ///
    /// 每多失败一次翻倍，不超过 `retry_cooldown_max_frames`。
    pub fn retry_cooldown(&self, consecutive_failures: u32) -> u32 {
        if consecutive_failures == 0 {
            return 0;
        }
        let factor = 1u32.checked_shl(consecutive_failures - 1).unwrap_or(u32::MAX);
        self.retry_cooldown_base_frames.saturating_mul(factor).min(self.retry_cooldown_max_frames)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub app_name: String,
    pub window_width: u32,
    pub window_height: u32,
    pub back_buffer_count: u32,
    pub emulated_backend: EmulatedBackend,
    pub swapchain: SwapchainLifecycleConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "prism".to_string(),
            window_width: 1280,
            window_height: 720,
            back_buffer_count: 3,
            emulated_backend: EmulatedBackend::default(),
            swapchain: SwapchainLifecycleConfig::default(),
        }
    }
}

impl RendererConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path.as_ref()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: RendererConfig = toml::from_str(content)?;
        anyhow::ensure!(config.back_buffer_count > 0, "back_buffer_count must be positive");
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path.as_ref(), content).with_context(|| format!("写入配置文件失败: {:?}", path.as_ref()))?;
        Ok(())
    }
}

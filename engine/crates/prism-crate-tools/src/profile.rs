/// 打开一个 tracy zone
///
/// 只有在 tracy client 已经启动时才会真正创建 zone，否则返回 `None`。
///
/// ```ignore
/// let _span = prism_crate_tools::profile_span!("ResourceManager::cleanup");
/// ```
#[macro_export]
macro_rules! profile_span {
    ($name:literal) => {
        $crate::__tracy::Client::running()
            .map(|client| client.span($crate::__tracy::span_location!($name), 0))
    };
}

/// 在 tracy 中标记一帧的结束
#[inline]
pub fn frame_mark() {
    if let Some(client) = tracy_client::Client::running() {
        client.frame_mark();
    }
}

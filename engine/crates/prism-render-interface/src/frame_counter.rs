use std::fmt;

/// back buffer 槽位的标签，仅用于日志
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameLabel(u32);

impl fmt::Display for FrameLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A, B, C ...
        let c = char::from_u32('A' as u32 + self.0 % 26).unwrap_or('?');
        write!(f, "{}", c)
    }
}

pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
    /// 同时在途的帧数量，等于 back buffer 数量
    back_buffer_count: u32,
}
// new & init
impl FrameCounter {
    pub fn new(init_frame_id: u64, back_buffer_count: u32) -> Self {
        assert!(back_buffer_count > 0, "back buffer count must be positive");
        Self {
            frame_id: init_frame_id,
            back_buffer_count,
        }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
    #[inline]
    pub fn back_buffer_count(&self) -> u32 {
        self.back_buffer_count
    }
    /// 当前帧使用的命令列表 / fence 槽位
    #[inline]
    pub fn frame_slot(&self) -> usize {
        (self.frame_id % self.back_buffer_count as u64) as usize
    }
    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        FrameLabel(self.frame_slot() as u32)
    }
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_slots_round_robin() {
        let mut counter = FrameCounter::new(0, 3);
        let mut names = vec![];
        for _ in 0..4 {
            names.push(counter.frame_name());
            counter.next_frame();
        }
        assert_eq!(names, vec!["[F0A]", "[F1B]", "[F2C]", "[F3A]"]);
    }
}

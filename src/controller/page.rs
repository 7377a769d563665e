use std::ops::Range;

use crate::error::{AdminError, Result};

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// 分页窗口，页码从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    size: usize,
    index: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            size: DEFAULT_PAGE_SIZE,
            index: 1,
        }
    }
}

impl PageWindow {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(AdminError::InvalidPageSize);
        }
        Ok(Self { size, index: 1 })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 修改每页条数并回到第一页
    pub fn resize(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(AdminError::InvalidPageSize);
        }
        self.size = size;
        self.index = 1;
        Ok(())
    }

    /// 跳转到第 n 页，结果限制在 [1, 页数] 内
    pub fn go_to(&mut self, n: usize, len: usize) {
        self.index = n.clamp(1, page_count(len, self.size));
    }

    pub fn reset(&mut self) {
        self.index = 1;
    }

    /// 数据量变化后重新限制页码
    pub fn clamp(&mut self, len: usize) {
        self.go_to(self.index, len);
    }

    pub fn bounds(&self, len: usize) -> Range<usize> {
        slice_bounds(len, self.size, self.index)
    }
}

/// 总页数，至少为 1
pub fn page_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1)).max(1)
}

/// 第 index 页在过滤结果中的下标范围
pub fn slice_bounds(len: usize, size: usize, index: usize) -> Range<usize> {
    let start = index.saturating_sub(1).saturating_mul(size).min(len);
    let end = start.saturating_add(size).min(len);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 5), 1);
        assert_eq!(page_count(5, 5), 1);
        assert_eq!(page_count(6, 5), 2);
        assert_eq!(page_count(12, 5), 3);
    }

    #[test]
    fn test_last_page_of_twelve() {
        let mut window = PageWindow::new(5).unwrap();
        window.go_to(usize::MAX, 12);
        assert_eq!(window.index(), 3);
        assert_eq!(window.bounds(12), 10..12);
    }

    #[test]
    fn test_go_to_clamps_low() {
        let mut window = PageWindow::default();
        window.go_to(0, 12);
        assert_eq!(window.index(), 1);
        window.go_to(2, 0);
        assert_eq!(window.index(), 1);
        assert!(window.bounds(0).is_empty());
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(PageWindow::new(0), Err(AdminError::InvalidPageSize)));
        let mut window = PageWindow::default();
        window.go_to(2, 12);
        assert!(window.resize(0).is_err());
        assert_eq!(window.size(), DEFAULT_PAGE_SIZE);
        assert_eq!(window.index(), 2);
    }

    #[test]
    fn test_beyond_last_page_is_empty() {
        assert!(slice_bounds(12, 5, 4).is_empty());
    }
}

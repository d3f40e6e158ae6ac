//! Viewport windowing for the virtualized job list.
//!
//! Given a scroll offset and viewport height, computes the row range
//! that must be materialized (visible range plus overscan) and decides
//! when the trailing edge is close enough to warrant fetching the next
//! page. The computation is restartable: everything is re-derived per
//! call, with only the threshold-crossing latch carried between calls.

use std::collections::HashMap;

/// Scroll state of the rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
  pub offset: u32,
  pub height: u32,
}

/// One materialized row slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualRow {
  pub index: usize,
  /// Absolute render offset from the top of the list
  pub offset: u32,
  pub size: u32,
}

/// Result of one windowing pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
  pub rows: Vec<VirtualRow>,
  /// Total height of the full list, for scrollbar math
  pub total_size: u32,
  /// Set on the pass where the visible range first crosses into the
  /// trailing threshold (edge-triggered, at most once per crossing)
  pub load_more: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowerOptions {
  /// Estimated row size, used for every row without a measurement
  pub estimate_size: u32,
  /// Extra rows materialized beyond the visible range on both ends
  pub overscan: usize,
  /// Trailing row count that arms the load-more trigger
  pub load_ahead: usize,
}

impl Default for WindowerOptions {
  fn default() -> Self {
    // Rows are terminal cells, one high; overscan and look-ahead
    // follow the reference renderer.
    Self {
      estimate_size: 1,
      overscan: 10,
      load_ahead: 5,
    }
  }
}

pub struct ViewportWindower {
  options: WindowerOptions,
  /// Measured row sizes overriding the estimate, by index
  measured: HashMap<usize, u32>,
  past_threshold: bool,
}

impl ViewportWindower {
  pub fn new(options: WindowerOptions) -> Self {
    Self {
      options,
      measured: HashMap::new(),
      past_threshold: false,
    }
  }

  /// Record the rendered size of one row
  #[allow(dead_code)]
  pub fn measure(&mut self, index: usize, size: u32) {
    if size == self.options.estimate_size {
      self.measured.remove(&index);
    } else {
      self.measured.insert(index, size);
    }
  }

  fn size_of(&self, index: usize) -> u32 {
    self
      .measured
      .get(&index)
      .copied()
      .unwrap_or(self.options.estimate_size)
  }

  /// Compute the window for `count` rows at the given viewport.
  /// `has_next` and `fetching` gate the load-more signal: the trigger
  /// only fires when another page exists and no fetch is in flight.
  pub fn window(&mut self, count: usize, viewport: Viewport, has_next: bool, fetching: bool) -> Window {
    let (lo, hi, offsets) = if self.measured.is_empty() {
      self.uniform_range(count, viewport)
    } else {
      self.measured_range(count, viewport)
    };

    let total_size = match &offsets {
      Some(cumulative) => *cumulative.last().unwrap_or(&0),
      None => count as u32 * self.options.estimate_size,
    };

    let rows = (lo..hi)
      .map(|index| VirtualRow {
        index,
        offset: match &offsets {
          Some(cumulative) => cumulative[index],
          None => index as u32 * self.options.estimate_size,
        },
        size: self.size_of(index),
      })
      .collect();

    // Trailing-edge detection on the overscanned bound, like the
    // reference renderer's last materialized item.
    let near_end = count > 0 && hi >= count.saturating_sub(self.options.load_ahead);
    let load_more = near_end && !self.past_threshold && has_next && !fetching;
    self.past_threshold = near_end;

    Window {
      rows,
      total_size,
      load_more,
    }
  }

  /// Constant-time range for uniform row sizes
  fn uniform_range(&self, count: usize, viewport: Viewport) -> (usize, usize, Option<Vec<u32>>) {
    let size = self.options.estimate_size.max(1);
    let lo = (viewport.offset / size) as usize;
    let hi = viewport.offset.saturating_add(viewport.height).div_ceil(size) as usize;
    let (lo, hi) = self.clamp_expand(lo, hi, count);
    (lo, hi, None)
  }

  /// Prefix-sum search for measured (non-uniform) row sizes
  fn measured_range(&self, count: usize, viewport: Viewport) -> (usize, usize, Option<Vec<u32>>) {
    // cumulative[i] = offset of row i; cumulative[count] = total size
    let mut cumulative = Vec::with_capacity(count + 1);
    let mut acc = 0u32;
    for index in 0..count {
      cumulative.push(acc);
      acc = acc.saturating_add(self.size_of(index));
    }
    cumulative.push(acc);

    let lo = cumulative[..count]
      .partition_point(|&offset| offset <= viewport.offset)
      .saturating_sub(1);
    let bottom = viewport.offset.saturating_add(viewport.height);
    let hi = cumulative[..count].partition_point(|&offset| offset < bottom);

    let (lo, hi) = self.clamp_expand(lo, hi, count);
    (lo, hi, Some(cumulative))
  }

  fn clamp_expand(&self, lo: usize, hi: usize, count: usize) -> (usize, usize) {
    let lo = lo.saturating_sub(self.options.overscan);
    let hi = (hi + self.options.overscan).min(count);
    (lo.min(hi), hi)
  }
}

impl Default for ViewportWindower {
  fn default() -> Self {
    Self::new(WindowerOptions::default())
  }
}

/// Limited-area subzone names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subzone {
    /// Physical core
    C,
    /// Core and interior (relaxation) zone
    CI,
}

/// Limited-area zones of a rectangular grid whose full extent is the
/// C+I+E zone. The E (extension) zone lies past `x_ci`/`y_ci`; the I zone
/// is a frame of width `x_iwidth`/`y_iwidth` inside the CI zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LamZone {
    pub x_ci: usize,
    pub y_ci: usize,
    pub x_iwidth: usize,
    pub y_iwidth: usize,
}

impl LamZone {
    pub fn new(x_ci: usize, y_ci: usize, x_iwidth: usize, y_iwidth: usize) -> Self {
        LamZone {
            x_ci,
            y_ci,
            x_iwidth,
            y_iwidth,
        }
    }

    /// Index bounds (j0, j1, i0, i1), ends excluded, of a subzone.
    pub fn bounds(&self, subzone: Subzone) -> (usize, usize, usize, usize) {
        match subzone {
            Subzone::CI => (0, self.y_ci, 0, self.x_ci),
            Subzone::C => (
                self.y_iwidth,
                self.y_ci - self.y_iwidth,
                self.x_iwidth,
                self.x_ci - self.x_iwidth,
            ),
        }
    }

    /// Zones left after restricting the grid to `subzone`.
    pub fn after_selection(&self, subzone: Subzone) -> Option<LamZone> {
        match subzone {
            Subzone::CI => Some(*self),
            Subzone::C => None,
        }
    }

    pub fn check(&self, nx: usize, ny: usize) -> bool {
        self.x_ci <= nx
            && self.y_ci <= ny
            && 2 * self.x_iwidth < self.x_ci
            && 2 * self.y_iwidth < self.y_ci
    }
}

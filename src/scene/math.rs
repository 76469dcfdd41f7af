use serde::{Deserialize, Serialize};

pub type V3 = [f64; 3];

/// Axis aligned box. An empty box has `min > max` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub min: V3,
    pub max: V3,
}

impl Bound {
    pub fn empty() -> Self {
        Self {
            min: [f64::MAX; 3],
            max: [f64::MIN; 3],
        }
    }

    pub fn new(min: V3, max: V3) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    pub fn extend_by_point(&mut self, point: V3) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
    }

    pub fn extend_by(&mut self, other: &Bound) {
        if other.is_empty() {
            return;
        }
        self.extend_by_point(other.min);
        self.extend_by_point(other.max);
    }

    pub fn corners(&self) -> [V3; 8] {
        let (a, b) = (self.min, self.max);
        [
            [a[0], a[1], a[2]],
            [b[0], a[1], a[2]],
            [a[0], b[1], a[2]],
            [b[0], b[1], a[2]],
            [a[0], a[1], b[2]],
            [b[0], a[1], b[2]],
            [a[0], b[1], b[2]],
            [b[0], b[1], b[2]],
        ]
    }
}

impl Default for Bound {
    fn default() -> Self {
        Self::empty()
    }
}

/// 4x4 matrix using the row-vector convention: points transform as `p * M`,
/// translation lives in the last row and `child * parent` maps child space to
/// world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix(pub [[f64; 4]; 4]);

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn identity() -> Self {
        Matrix([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn from_translation(t: V3) -> Self {
        let mut m = Self::identity();
        m.0[3][0] = t[0];
        m.0[3][1] = t[1];
        m.0[3][2] = t[2];
        m
    }

    pub fn from_scale(s: V3) -> Self {
        let mut m = Self::identity();
        m.0[0][0] = s[0];
        m.0[1][1] = s[1];
        m.0[2][2] = s[2];
        m
    }

    /// Rotation about X, then Y, then Z (radians).
    pub fn from_euler_xyz(r: V3) -> Self {
        let (sx, cx) = r[0].sin_cos();
        let (sy, cy) = r[1].sin_cos();
        let (sz, cz) = r[2].sin_cos();
        let x = Matrix([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, cx, sx, 0.0],
            [0.0, -sx, cx, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let y = Matrix([
            [cy, 0.0, -sy, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [sy, 0.0, cy, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let z = Matrix([
            [cz, sz, 0.0, 0.0],
            [-sz, cz, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        x.multiply(&y).multiply(&z)
    }

    pub fn multiply(&self, other: &Matrix) -> Matrix {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.0[i][k] * other.0[k][j]).sum();
            }
        }
        Matrix(out)
    }

    pub fn transform_point(&self, p: V3) -> V3 {
        let m = &self.0;
        let mut out = [0.0; 3];
        for (j, value) in out.iter_mut().enumerate() {
            *value = p[0] * m[0][j] + p[1] * m[1][j] + p[2] * m[2][j] + m[3][j];
        }
        let w = p[0] * m[0][3] + p[1] * m[1][3] + p[2] * m[2][3] + m[3][3];
        if w != 0.0 && w != 1.0 {
            for value in out.iter_mut() {
                *value /= w;
            }
        }
        out
    }

    pub fn transform_bound(&self, bound: &Bound) -> Bound {
        let mut out = Bound::empty();
        if bound.is_empty() {
            return out;
        }
        for corner in bound.corners() {
            out.extend_by_point(self.transform_point(corner));
        }
        out
    }

    /// Decomposes into scale, shear (xy, xz, yz), XYZ euler rotation (radians)
    /// and translation. Degenerate matrices yield `None`.
    pub fn extract_shrt(&self) -> Option<Shrt> {
        let m = &self.0;
        let mut rows = [
            [m[0][0], m[0][1], m[0][2]],
            [m[1][0], m[1][1], m[1][2]],
            [m[2][0], m[2][1], m[2][2]],
        ];
        let translate = [m[3][0], m[3][1], m[3][2]];

        let max_val = rows
            .iter()
            .flat_map(|row| row.iter())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_val == 0.0 {
            return None;
        }
        for row in rows.iter_mut() {
            for v in row.iter_mut() {
                *v /= max_val;
            }
        }

        let mut scale = [0.0; 3];
        let mut shear = [0.0; 3];

        scale[0] = length(rows[0]);
        if scale[0] == 0.0 {
            return None;
        }
        rows[0] = div(rows[0], scale[0]);

        shear[0] = dot(rows[0], rows[1]);
        rows[1] = sub(rows[1], mul(rows[0], shear[0]));
        scale[1] = length(rows[1]);
        if scale[1] == 0.0 {
            return None;
        }
        rows[1] = div(rows[1], scale[1]);
        shear[0] /= scale[1];

        shear[1] = dot(rows[0], rows[2]);
        rows[2] = sub(rows[2], mul(rows[0], shear[1]));
        shear[2] = dot(rows[1], rows[2]);
        rows[2] = sub(rows[2], mul(rows[1], shear[2]));
        scale[2] = length(rows[2]);
        if scale[2] == 0.0 {
            return None;
        }
        rows[2] = div(rows[2], scale[2]);
        shear[1] /= scale[2];
        shear[2] /= scale[2];

        if dot(rows[0], cross(rows[1], rows[2])) < 0.0 {
            for axis in 0..3 {
                scale[axis] = -scale[axis];
                rows[axis] = mul(rows[axis], -1.0);
            }
        }
        for s in scale.iter_mut() {
            *s *= max_val;
        }

        let rotate = euler_xyz(rows);
        Some(Shrt {
            scale,
            shear,
            rotate,
            translate,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shrt {
    pub scale: V3,
    pub shear: V3,
    pub rotate: V3,
    pub translate: V3,
}

fn euler_xyz(rows: [V3; 3]) -> V3 {
    let i = normalize(rows[0]);
    let j = normalize(rows[1]);
    let k = normalize(rows[2]);

    let x = j[2].atan2(k[2]);
    let (sx, cx) = x.sin_cos();
    // Undo the X rotation before reading Y and Z.
    let n1 = [cx * j[0] - sx * k[0], cx * j[1] - sx * k[1]];
    let cy = (i[0] * i[0] + i[1] * i[1]).sqrt();
    let y = (-i[2]).atan2(cy);
    let z = (-n1[0]).atan2(n1[1]);
    [x, y, z]
}

fn dot(a: V3, b: V3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: V3, b: V3) -> V3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn length(a: V3) -> f64 {
    dot(a, a).sqrt()
}

fn mul(a: V3, s: f64) -> V3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn div(a: V3, s: f64) -> V3 {
    [a[0] / s, a[1] / s, a[2] / s]
}

fn sub(a: V3, b: V3) -> V3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn normalize(a: V3) -> V3 {
    let l = length(a);
    if l == 0.0 {
        a
    } else {
        div(a, l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: V3, b: V3) -> bool {
        (0..3).all(|i| (a[i] - b[i]).abs() < 1e-9)
    }

    #[test]
    fn shrt_recovers_components() {
        let rotate = [0.3, -0.5, 1.1];
        let m = Matrix::from_scale([2.0, 3.0, 4.0])
            .multiply(&Matrix::from_euler_xyz(rotate))
            .multiply(&Matrix::from_translation([1.0, 2.0, 3.0]));
        let shrt = m.extract_shrt().unwrap();
        assert!(close(shrt.scale, [2.0, 3.0, 4.0]));
        assert!(close(shrt.shear, [0.0, 0.0, 0.0]));
        assert!(close(shrt.rotate, rotate));
        assert!(close(shrt.translate, [1.0, 2.0, 3.0]));
    }

    #[test]
    fn transform_bound_translates_corners() {
        let bound = Bound::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let moved = Matrix::from_translation([10.0, 0.0, 0.0]).transform_bound(&bound);
        assert_eq!(moved, Bound::new([9.0, -1.0, -1.0], [11.0, 1.0, 1.0]));
        assert!(Matrix::identity().transform_bound(&Bound::empty()).is_empty());
    }

    #[test]
    fn degenerate_matrix_has_no_decomposition() {
        assert!(Matrix::from_scale([0.0, 1.0, 1.0]).extract_shrt().is_none());
    }
}

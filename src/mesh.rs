//! Triangle meshes as compact spaces.
//!
//! Points are vertex indices. The spectrum comes from the cotangent Laplacian `L` with a lumped
//! (barycentric) mass matrix `M`: we solve `L φ = λ M φ` through the symmetric matrix
//! `M^{-1/2} L M^{-1/2}`, so the eigenfunctions are `M`-orthonormal.
//!
//! The eigensolve is dense and done once per mesh (cached); it is meant for meshes with up to a
//! few thousand vertices.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::key::Key;
use crate::linalg::symmetric_eigen;
use crate::space::{DiscreteSpectrumSpace, Eigenfunctions, Space};
use crate::{Error, Result};
use ndarray::{s, Array1, Array2, ArrayView1};

/// Upper bound on the default truncation for meshes.
pub const DEFAULT_NUM_EIGENFUNCTIONS: usize = 1000;

#[derive(Debug, Clone)]
struct Eigensystem {
    /// Ascending, clamped at 0.
    values: Array1<f64>,
    /// `[V, V]`, column `i` is the `i`-th eigenfunction sampled at the vertices.
    functions: Array2<f64>,
}

/// A triangulated surface.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Array2<f64>,
    faces: Array2<usize>,
    eigensystem: OnceLock<Eigensystem>,
}

impl Mesh {
    /// Build a mesh from `[V, 3]` vertex positions and `[F, 3]` triangle indices.
    pub fn new(vertices: Array2<f64>, faces: Array2<usize>) -> Result<Self> {
        let nv = vertices.nrows();
        if nv == 0 || faces.nrows() == 0 {
            return Err(Error::Domain("mesh needs at least one vertex and one face"));
        }
        if vertices.ncols() != 3 {
            return Err(Error::Shape("vertices must be [V, 3]"));
        }
        if faces.ncols() != 3 {
            return Err(Error::Shape("faces must be [F, 3]"));
        }
        if vertices.iter().any(|x| !x.is_finite()) {
            return Err(Error::Domain("vertex coordinates must be finite"));
        }

        let mut used = vec![false; nv];
        for face in faces.outer_iter() {
            if face.iter().any(|&i| i >= nv) {
                return Err(Error::Domain("face references a vertex index out of range"));
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(Error::Domain("face repeats a vertex index"));
            }
            let (a, b, c) = (vertices.row(face[0]), vertices.row(face[1]), vertices.row(face[2]));
            let area = triangle_area(&a, &b, &c);
            let scale = sq_norm(&(&b - &a).view()) + sq_norm(&(&c - &a).view());
            if area.is_nan() || area <= 1e-12 * scale {
                return Err(Error::Domain("face has zero area"));
            }
            for &i in face.iter() {
                used[i] = true;
            }
        }
        if used.iter().any(|&u| !u) {
            return Err(Error::Domain("mesh has a vertex not referenced by any face"));
        }

        Ok(Self {
            vertices,
            faces,
            eigensystem: OnceLock::new(),
        })
    }

    /// Icosahedral sphere: every icosahedron edge split into `resolution` segments, vertices
    /// projected to the unit sphere. `10·r² + 2` vertices, `20·r²` faces.
    pub fn icosphere(resolution: usize) -> Result<Self> {
        if resolution == 0 {
            return Err(Error::Domain("icosphere resolution must be >= 1"));
        }
        let (base_v, base_f) = icosahedron();
        let r = resolution;

        let mut index: HashMap<Vec<(usize, usize)>, usize> = HashMap::new();
        let mut positions: Vec<[f64; 3]> = Vec::new();
        let mut faces: Vec<[usize; 3]> = Vec::new();

        for tri in &base_f {
            // local[(i, j)] = global index of barycentric point (i, j, r - i - j)
            let mut local: HashMap<(usize, usize), usize> = HashMap::new();
            for i in 0..=r {
                for j in 0..=(r - i) {
                    let k = r - i - j;
                    let mut key: Vec<(usize, usize)> = [(tri[0], i), (tri[1], j), (tri[2], k)]
                        .into_iter()
                        .filter(|&(_, w)| w > 0)
                        .collect();
                    key.sort_unstable();
                    let id = *index.entry(key).or_insert_with(|| {
                        let mut p = [0.0f64; 3];
                        for d in 0..3 {
                            p[d] = (i as f64 * base_v[tri[0]][d]
                                + j as f64 * base_v[tri[1]][d]
                                + k as f64 * base_v[tri[2]][d])
                                / r as f64;
                        }
                        let n = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
                        positions.push([p[0] / n, p[1] / n, p[2] / n]);
                        positions.len() - 1
                    });
                    local.insert((i, j), id);
                }
            }
            for i in 0..r {
                for j in 0..(r - i) {
                    faces.push([local[&(i, j)], local[&(i + 1, j)], local[&(i, j + 1)]]);
                    if i + j + 1 < r {
                        faces.push([local[&(i + 1, j)], local[&(i + 1, j + 1)], local[&(i, j + 1)]]);
                    }
                }
            }
        }

        let vertices = Array2::from_shape_fn((positions.len(), 3), |(i, d)| positions[i][d]);
        let faces = Array2::from_shape_fn((faces.len(), 3), |(i, d)| faces[i][d]);
        Self::new(vertices, faces)
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.nrows()
    }

    pub fn vertices(&self) -> &Array2<f64> {
        &self.vertices
    }

    pub fn faces(&self) -> &Array2<usize> {
        &self.faces
    }

    /// Cotangent Laplacian (positive semi-definite convention) and lumped vertex masses.
    pub fn laplacian_and_mass(&self) -> (Array2<f64>, Array1<f64>) {
        let nv = self.num_vertices();
        let mut lap = Array2::<f64>::zeros((nv, nv));
        let mut mass = Array1::<f64>::zeros(nv);

        for face in self.faces.outer_iter() {
            let idx = [face[0], face[1], face[2]];
            let p = [
                self.vertices.row(idx[0]),
                self.vertices.row(idx[1]),
                self.vertices.row(idx[2]),
            ];
            let area = triangle_area(&p[0], &p[1], &p[2]);
            for c in 0..3 {
                let (a, b) = ((c + 1) % 3, (c + 2) % 3);
                let u = &p[a] - &p[c];
                let v = &p[b] - &p[c];
                // |u × v| = 2·area for every corner
                let cot = u.dot(&v) / (2.0 * area);
                let w = 0.5 * cot;
                let (ia, ib) = (idx[a], idx[b]);
                lap[[ia, ib]] -= w;
                lap[[ib, ia]] -= w;
                lap[[ia, ia]] += w;
                lap[[ib, ib]] += w;
                mass[idx[c]] += area / 3.0;
            }
        }
        (lap, mass)
    }

    fn eigensystem(&self) -> Result<&Eigensystem> {
        if let Some(e) = self.eigensystem.get() {
            return Ok(e);
        }
        let solved = self.solve_eigensystem()?;
        Ok(self.eigensystem.get_or_init(|| solved))
    }

    fn solve_eigensystem(&self) -> Result<Eigensystem> {
        let nv = self.num_vertices();
        log::debug!("mesh eigensolve: {nv} vertices, {} faces", self.num_faces());

        let (lap, mass) = self.laplacian_and_mass();
        let inv_sqrt_m = mass.mapv(|m| 1.0 / m.sqrt());
        let mut sym = lap;
        for i in 0..nv {
            for j in 0..nv {
                sym[[i, j]] *= inv_sqrt_m[i] * inv_sqrt_m[j];
            }
        }
        // symmetrize away rounding before the solver sees it
        let sym = (&sym + &sym.t()) * 0.5;

        let (mut values, mut functions) = symmetric_eigen(&sym.view())?;
        if values[0] < -1e-8 {
            log::warn!(
                "mesh Laplacian has a negative eigenvalue {:.3e}; clamping to 0",
                values[0]
            );
        }
        values.mapv_inplace(|v| v.max(0.0));
        for i in 0..nv {
            let scale = inv_sqrt_m[i];
            functions.row_mut(i).mapv_inplace(|v| v * scale);
        }
        Ok(Eigensystem { values, functions })
    }
}

fn sq_norm(v: &ArrayView1<f64>) -> f64 {
    v.dot(v)
}

fn triangle_area(a: &ArrayView1<f64>, b: &ArrayView1<f64>, c: &ArrayView1<f64>) -> f64 {
    let u = b - a;
    let v = c - a;
    let cx = u[1] * v[2] - u[2] * v[1];
    let cy = u[2] * v[0] - u[0] * v[2];
    let cz = u[0] * v[1] - u[1] * v[0];
    0.5 * (cx * cx + cy * cy + cz * cz).sqrt()
}

fn icosahedron() -> (Vec<[f64; 3]>, Vec<[usize; 3]>) {
    let t = (1.0 + 5.0f64.sqrt()) / 2.0;
    let v = vec![
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];
    let f = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    (v, f)
}

/// Eigenfunctions of a mesh: a `[V, M]` table indexed by vertex.
#[derive(Debug, Clone)]
pub struct MeshEigenfunctions {
    table: Array2<f64>,
}

impl Eigenfunctions<Vec<usize>> for MeshEigenfunctions {
    fn num_eigenfunctions(&self) -> usize {
        self.table.ncols()
    }

    fn evaluate(&self, points: &Vec<usize>) -> Result<Array2<f64>> {
        let nv = self.table.nrows();
        let mut out = Array2::<f64>::zeros((points.len(), self.table.ncols()));
        for (r, &v) in points.iter().enumerate() {
            if v >= nv {
                return Err(Error::Domain("vertex index out of range"));
            }
            out.row_mut(r).assign(&self.table.row(v));
        }
        Ok(out)
    }

    fn mean_squares(&self) -> Array1<f64> {
        let nv = self.table.nrows() as f64;
        self.table
            .columns()
            .into_iter()
            .map(|c| c.dot(&c) / nv)
            .collect()
    }
}

impl Space for Mesh {
    type Points = Vec<usize>;

    fn dimension(&self) -> usize {
        2
    }

    fn num_points(&self, points: &Vec<usize>) -> usize {
        points.len()
    }

    fn validate_points(&self, points: &Vec<usize>) -> Result<()> {
        if points.iter().any(|&v| v >= self.num_vertices()) {
            return Err(Error::Domain("vertex index out of range"));
        }
        Ok(())
    }

    fn random_points(&self, key: Key, n: usize) -> Result<(Key, Vec<usize>)> {
        key.indices(n, self.num_vertices())
    }
}

impl DiscreteSpectrumSpace for Mesh {
    type Eigenfunctions = MeshEigenfunctions;

    fn default_levels(&self) -> usize {
        DEFAULT_NUM_EIGENFUNCTIONS.min(self.num_vertices())
    }

    fn num_eigenfunctions(&self, levels: usize) -> Result<usize> {
        if levels == 0 {
            return Err(Error::Domain("number of eigenfunctions must be >= 1"));
        }
        if levels > self.num_vertices() {
            return Err(Error::Domain("more eigenfunctions requested than mesh vertices"));
        }
        Ok(levels)
    }

    fn eigenvalues(&self, levels: usize) -> Result<Array1<f64>> {
        let m = self.num_eigenfunctions(levels)?;
        Ok(self.eigensystem()?.values.slice(s![..m]).to_owned())
    }

    fn eigenfunctions(&self, levels: usize) -> Result<MeshEigenfunctions> {
        let m = self.num_eigenfunctions(levels)?;
        Ok(MeshEigenfunctions {
            table: self.eigensystem()?.functions.slice(s![.., ..m]).to_owned(),
        })
    }
}

//! Editing session
//!
//! The session is the explicit context the process entry point creates and
//! passes around. It owns the configuration, the face builder derived from it,
//! and the two pieces of shared mutable state: the rule registry and the
//! assembly tree. Both sit behind reader-writer locks so traversal and
//! validation can run concurrently while structural edits are exclusive.

use parking_lot::{RwLock, RwLockReadGuard};
use pk_cad::constraint::{Entity, EntityId, Violation};
use pk_cad::nurbs::{NurbsCurve, Profile, SweepSection, sweep_profile};
use pk_cad::{BRepBuilder, CadError, CadResult, ConstraintSystem, ErrorCode, ErrorReport, Face, Vertex};

use crate::assembly::{AssemblyComponent, AssemblyError, AssemblyTree, ComponentId};
use crate::config::{ConfigError, KernelConfig};

/// Kernel state for one editing session
#[derive(Debug)]
pub struct Session {
    config: KernelConfig,
    builder: BRepBuilder,
    constraints: RwLock<ConstraintSystem>,
    assembly: RwLock<AssemblyTree>,
}

impl Session {
    /// Create a session with an empty rule set and a default root component
    pub fn new(config: KernelConfig) -> Result<Self, SessionError> {
        Self::with_assembly(config, AssemblyTree::default())
    }

    /// Create a session around an existing assembly
    pub fn with_assembly(config: KernelConfig, assembly: AssemblyTree) -> Result<Self, SessionError> {
        config.validate()?;
        let builder =
            BRepBuilder::with_tolerances(config.tolerance.coincidence, config.tolerance.planarity);
        tracing::debug!(
            coincidence = config.tolerance.coincidence,
            planarity = config.tolerance.planarity,
            "session created"
        );
        Ok(Self {
            config,
            builder,
            constraints: RwLock::new(ConstraintSystem::new()),
            assembly: RwLock::new(assembly),
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn builder(&self) -> &BRepBuilder {
        &self.builder
    }

    // ============== Locked State ==============

    /// Shared read access to the assembly
    pub fn assembly(&self) -> RwLockReadGuard<'_, AssemblyTree> {
        self.assembly.read()
    }

    /// Shared read access to the rule registry
    pub fn constraints(&self) -> RwLockReadGuard<'_, ConstraintSystem> {
        self.constraints.read()
    }

    /// Run a structural edit with exclusive access to the assembly
    pub fn edit_assembly<R>(&self, edit: impl FnOnce(&mut AssemblyTree) -> R) -> R {
        let mut tree = self.assembly.write();
        edit(&mut tree)
    }

    /// Run an edit with exclusive access to the rule registry
    pub fn edit_constraints<R>(&self, edit: impl FnOnce(&mut ConstraintSystem) -> R) -> R {
        let mut rules = self.constraints.write();
        edit(&mut rules)
    }

    // ============== Geometry ==============

    /// Build a face with the session's tolerances
    pub fn create_face(&self, vertices: &[&Vertex]) -> CadResult<Face> {
        self.builder.create_face(vertices)
    }

    /// Build a face and attach it as a new component under `parent`
    ///
    /// The face is validated before the assembly is locked, so a bad loop
    /// never leaves a half-inserted component behind.
    pub fn add_face_component(
        &self,
        parent: ComponentId,
        name: impl Into<String>,
        vertices: &[&Vertex],
    ) -> Result<ComponentId, SessionError> {
        let face = self.builder.create_face(vertices)?;
        let id = self.edit_assembly(|tree| {
            tree.insert_under(parent, AssemblyComponent::from_face(name, face))
        })?;
        Ok(id)
    }

    /// Sweep a profile along a path using the configured section count
    pub fn sweep(
        &self,
        profile: &Profile,
        path: &NurbsCurve,
        end_scale: f64,
        total_twist: f64,
    ) -> CadResult<Vec<SweepSection>> {
        sweep_profile(
            profile,
            path,
            self.config.evaluation.sweep_samples,
            end_scale,
            total_twist,
        )
    }

    // ============== Constraints ==============

    /// Register a length rule using the configured default tolerance
    pub fn add_length_constraint(
        &self,
        id: &str,
        name: &str,
        target: f64,
        message: &str,
    ) -> Result<(), SessionError> {
        let tolerance = self.config.constraints.default_tolerance;
        self.edit_constraints(|rules| {
            rules
                .add_length_constraint(id, name, target, tolerance, message)
                .map(|_| ())
        })?;
        Ok(())
    }

    /// Bind a rule to an entity
    pub fn bind(&self, rule_id: &str, entity: EntityId) -> Result<(), SessionError> {
        self.edit_constraints(|rules| rules.bind(rule_id, entity))?;
        Ok(())
    }

    /// Re-run the rules bound to an entity after the caller edited it
    pub fn revalidate(
        &self,
        entity_id: EntityId,
        entity: &Entity<'_>,
    ) -> Result<Vec<Violation>, SessionError> {
        Ok(self.constraints().revalidate(entity_id, entity)?)
    }
}

/// Errors surfaced through a session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Cad(#[from] CadError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::Cad(e) => e.code(),
            SessionError::Assembly(e) => e.code(),
            SessionError::Config(e) => e.code(),
        }
    }

    /// Structured form for the error-reporting layer
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::TraversalOrder;
    use glam::{DVec2, DVec3};
    use pk_cad::nurbs::ControlPoint;

    fn triangle() -> [Vertex; 3] {
        [
            Vertex::from_xyz(0.0, 0.0, 0.0),
            Vertex::from_xyz(1.0, 0.0, 0.0),
            Vertex::from_xyz(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_session_rejects_invalid_config() {
        let mut config = KernelConfig::default();
        config.tolerance.planarity = f64::NAN;
        let err = Session::new(config).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_add_face_component() {
        let session = Session::new(KernelConfig::default()).unwrap();
        let root = session.assembly().root();
        let [a, b, c] = triangle();
        let id = session.add_face_component(root, "plate", &[&a, &b, &c]).unwrap();

        let tree = session.assembly();
        assert_eq!(tree.parent(id), Some(root));
        assert_eq!(tree.get(id).map(|c| c.name.as_str()), Some("plate"));
    }

    #[test]
    fn test_bad_face_leaves_assembly_untouched() {
        let session = Session::new(KernelConfig::default()).unwrap();
        let root = session.assembly().root();
        let [a, b, _] = triangle();
        let err = session.add_face_component(root, "bad", &[&a, &b]).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(session.assembly().len(), 1);
        assert_eq!(err.report().code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_edit_assembly_cycle_error_code() {
        let session = Session::new(KernelConfig::default()).unwrap();
        let result: Result<(), AssemblyError> = session.edit_assembly(|tree| {
            let a = tree.insert(AssemblyComponent::empty("a"));
            let b = tree.insert(AssemblyComponent::empty("b"));
            tree.add_component(a, b)?;
            tree.add_component(b, a)
        });
        let err = SessionError::from(result.unwrap_err());
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn test_length_rule_through_session() {
        let mut config = KernelConfig::default();
        config.constraints.default_tolerance = 0.01;
        let session = Session::new(config).unwrap();
        session
            .add_length_constraint("len", "Length 5", 5.0, "edge must be 5 long")
            .unwrap();
        let edge = EntityId::new();
        session.bind("len", edge).unwrap();

        let ok = Entity::line(DVec3::ZERO, DVec3::new(5.0, 0.0, 0.0));
        assert!(session.revalidate(edge, &ok).unwrap().is_empty());

        let long = Entity::line(DVec3::ZERO, DVec3::new(5.2, 0.0, 0.0));
        let violations = session.revalidate(edge, &long).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "edge must be 5 long");

        let err = session
            .add_length_constraint("len", "Again", 5.0, "dup")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(session.constraints().len(), 1);
    }

    #[test]
    fn test_sweep_uses_configured_samples() {
        let mut config = KernelConfig::default();
        config.evaluation.sweep_samples = 5;
        let session = Session::new(config).unwrap();

        let path = NurbsCurve::clamped(
            1,
            vec![ControlPoint::new(DVec3::ZERO), ControlPoint::new(DVec3::Z * 4.0)],
        )
        .unwrap();
        let profile = Profile::new(vec![
            DVec2::new(-1.0, -1.0),
            DVec2::new(1.0, -1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(-1.0, 1.0),
        ])
        .unwrap();

        let sections = session.sweep(&profile, &path, 0.5, 0.0).unwrap();
        assert_eq!(sections.len(), 5);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_shared_types_are_send_and_sync() {
        assert_send_sync::<Session>();
        assert_send_sync::<ConstraintSystem>();
        assert_send_sync::<AssemblyTree>();
        assert_send_sync::<NurbsCurve>();
        assert_send_sync::<BRepBuilder>();
    }

    #[test]
    fn test_concurrent_readers() {
        let session = Session::new(KernelConfig::default()).unwrap();
        let first = session.assembly();
        let second = session.assembly();
        assert_eq!(first.root(), second.root());
    }

    #[test]
    fn test_readers_and_writer_across_threads() {
        const EDITS: usize = 64;

        let session = Session::new(KernelConfig::default()).unwrap();
        let root = session.assembly().root();
        session
            .add_length_constraint("len", "Length 5", 5.0, "edge must be 5 long")
            .unwrap();
        let edge = EntityId::new();
        session.bind("len", edge).unwrap();

        let path = NurbsCurve::clamped(
            2,
            vec![
                ControlPoint::xy(0.0, 0.0),
                ControlPoint::xy(1.0, 2.0),
                ControlPoint::xy(2.0, 0.0),
            ],
        )
        .unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..EDITS {
                    session
                        .edit_assembly(|tree| {
                            tree.insert_under(root, AssemblyComponent::empty(format!("part-{i}")))
                        })
                        .unwrap();
                }
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    for step in 0..EDITS {
                        {
                            // A writer can never be halfway through an edit here
                            let tree = session.assembly();
                            let visited: Vec<ComponentId> = tree
                                .traverse(TraversalOrder::Pre)
                                .map(|(id, _)| id)
                                .collect();
                            assert_eq!(visited.len(), tree.len());
                            assert_eq!(visited[0], root);
                            assert_eq!(tree.children(root).map(<[_]>::len), Some(tree.len() - 1));
                        }

                        let length = if step % 2 == 0 { 5.0 } else { 5.5 };
                        let line = Entity::line(DVec3::ZERO, DVec3::new(length, 0.0, 0.0));
                        let violations = session.revalidate(edge, &line).unwrap();
                        assert_eq!(violations.len(), step % 2);
                    }
                });
            }

            for _ in 0..2 {
                scope.spawn(|| {
                    let [a, b, c] = triangle();
                    for step in 0..EDITS {
                        let face = session.create_face(&[&a, &b, &c]).unwrap();
                        approx::assert_abs_diff_eq!(face.area(), 0.5, epsilon = 1e-12);

                        let u = step as f64 / (EDITS - 1) as f64;
                        let point = path.point_at(u).unwrap();
                        assert!(point.y >= 0.0 && point.y <= 1.0 + 1e-12);
                    }
                });
            }
        });

        let tree = session.assembly();
        assert_eq!(tree.len(), EDITS + 1);
        assert_eq!(tree.children(root).map(<[_]>::len), Some(EDITS));
    }
}

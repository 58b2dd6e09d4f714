//! Build-time registry of processing operations
//!
//! Each operation name maps to a constructor that binds the call's known
//! parameters into a typed [`Operation`]. Keyword arguments the registry does
//! not know are kept on the [`Step`] and handed to the engine untouched.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::RecipeError;
use crate::recipe::{Call, Value};

/// A validated processing step
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Open the raw FID
    Fid { path: String },
    /// Create the processed output dataset
    Create { path: String },
    /// Select dimensions for the following steps; empty means all
    Dim { dims: Vec<u32> },
    /// Sine-bell apodization
    Sb { offset: f64, end: f64, power: f64 },
    /// Exponential line broadening
    Expd { lb: f64 },
    /// Lorentz-to-Gauss apodization
    Gm { g1: f64, g2: f64, g3: f64 },
    /// Zero fill by a power of two
    Zf { factor: u32 },
    Ft,
    Phase { ph0: f64, ph1: f64 },
    /// Keep a region of the spectrum; `mode` is interpreted by the engine
    Extract { start: f64, end: f64, mode: String },
    Real,
    #[serde(rename = "run")]
    Run,
}

impl Operation {
    /// Registry name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fid { .. } => "FID",
            Self::Create { .. } => "CREATE",
            Self::Dim { .. } => "DIM",
            Self::Sb { .. } => "SB",
            Self::Expd { .. } => "EXPD",
            Self::Gm { .. } => "GM",
            Self::Zf { .. } => "ZF",
            Self::Ft => "FT",
            Self::Phase { .. } => "PHASE",
            Self::Extract { .. } => "EXTRACT",
            Self::Real => "REAL",
            Self::Run => "run",
        }
    }

    /// Steps that act on the dimensions chosen by the last `DIM`
    pub fn is_per_dimension(&self) -> bool {
        !matches!(
            self,
            Self::Fid { .. } | Self::Create { .. } | Self::Dim { .. } | Self::Run
        )
    }
}

impl fmt::Display for Operation {
    /// Canonical, re-parseable form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Self::Fid { path } | Self::Create { path } => {
                write!(f, "{}({})", name, Value::Str(path.clone()))
            }
            Self::Dim { dims } => {
                let dims: Vec<String> = dims.iter().map(u32::to_string).collect();
                write!(f, "{}({})", name, dims.join(", "))
            }
            Self::Sb { offset, end, power } => {
                write!(f, "{}(offset={}, end={}, power={})", name, offset, end, power)
            }
            Self::Expd { lb } => write!(f, "{}(lb={})", name, lb),
            Self::Gm { g1, g2, g3 } => write!(f, "{}(g1={}, g2={}, g3={})", name, g1, g2, g3),
            Self::Zf { factor } => write!(f, "{}(factor={})", name, factor),
            Self::Phase { ph0, ph1 } => write!(f, "{}(ph0={}, ph1={})", name, ph0, ph1),
            Self::Extract { start, end, mode } => write!(
                f,
                "{}(start={}, end={}, mode={})",
                name,
                start,
                end,
                Value::Str(mode.clone())
            ),
            Self::Ft | Self::Real | Self::Run => write!(f, "{}()", name),
        }
    }
}

/// An operation plus the keyword arguments passed through to the engine
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Operation,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Step {
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            extra: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Step {
    /// The operation's canonical form with pass-through keywords appended
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let canonical = self.op.to_string();
        if self.extra.is_empty() {
            return f.write_str(&canonical);
        }

        let head = canonical.strip_suffix(')').unwrap_or(&canonical);
        f.write_str(head)?;
        let mut first = head.ends_with('(');
        for (key, value) in &self.extra {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        f.write_str(")")
    }
}

/// Arguments of one call, bound to parameter names
pub struct BoundArgs {
    named: HashMap<&'static str, Value>,
    rest: Vec<Value>,
    extra: BTreeMap<String, Value>,
}

impl BoundArgs {
    fn take(&self, param: &str) -> Option<&Value> {
        self.named.get(param)
    }

    fn number(&self, param: &str, default: Option<f64>) -> Result<f64, String> {
        match (self.take(param), default) {
            (Some(Value::Number(n)), _) => Ok(*n),
            (Some(other), _) => Err(format!("'{}' must be a number, got {}", param, other)),
            (None, Some(d)) => Ok(d),
            (None, None) => Err(format!("missing required argument '{}'", param)),
        }
    }

    fn string(&self, param: &str, default: Option<&str>) -> Result<String, String> {
        match (self.take(param), default) {
            (Some(Value::Str(s)), _) | (Some(Value::Ident(s)), _) => Ok(s.clone()),
            (Some(other), _) => Err(format!("'{}' must be a string, got {}", param, other)),
            (None, Some(d)) => Ok(d.to_string()),
            (None, None) => Err(format!("missing required argument '{}'", param)),
        }
    }

    fn positive_int(value: &Value, what: &str) -> Result<u32, String> {
        match value {
            Value::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= f64::from(u32::MAX) => {
                Ok(*n as u32)
            }
            other => Err(format!("{} must be a positive integer, got {}", what, other)),
        }
    }
}

type Factory = fn(&BoundArgs) -> Result<Operation, String>;

/// Registry entry: name, parameters and constructor
#[derive(Clone)]
pub struct OperationSpec {
    pub name: &'static str,
    pub params: &'static [&'static str],
    /// Accepts any number of positional arguments instead of `params`
    pub variadic: bool,
    pub about: &'static str,
    build: Factory,
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .finish()
    }
}

impl OperationSpec {
    /// Usage string, e.g. `PHASE(ph0, ph1)`
    pub fn signature(&self) -> String {
        if self.variadic {
            format!("{}(dim...)", self.name)
        } else {
            format!("{}({})", self.name, self.params.join(", "))
        }
    }

    fn bind(&self, call: &Call) -> Result<BoundArgs, String> {
        let mut named = HashMap::new();
        let mut rest = Vec::new();
        let mut extra = BTreeMap::new();

        if self.variadic {
            rest.extend(call.positional.iter().cloned());
        } else {
            if call.positional.len() > self.params.len() {
                return Err(format!(
                    "takes at most {} argument(s), got {}",
                    self.params.len(),
                    call.positional.len()
                ));
            }
            for (param, value) in self.params.iter().zip(&call.positional) {
                named.insert(*param, value.clone());
            }
        }

        for (key, value) in &call.keywords {
            let duplicate = match self.params.iter().find(|p| **p == key.as_str()) {
                Some(param) => named.insert(*param, value.clone()).is_some(),
                None => extra.insert(key.clone(), value.clone()).is_some(),
            };
            if duplicate {
                return Err(format!("argument '{}' given more than once", key));
            }
        }

        Ok(BoundArgs { named, rest, extra })
    }
}

const BUILTIN_OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        name: "FID",
        params: &["path"],
        variadic: false,
        about: "Open the raw FID file or directory",
        build: |args| Ok(Operation::Fid { path: args.string("path", None)? }),
    },
    OperationSpec {
        name: "CREATE",
        params: &["path"],
        variadic: false,
        about: "Create the processed dataset",
        build: |args| Ok(Operation::Create { path: args.string("path", None)? }),
    },
    OperationSpec {
        name: "DIM",
        params: &[],
        variadic: true,
        about: "Select dimensions for the following steps (none = all)",
        build: |args| {
            let dims = args
                .rest
                .iter()
                .map(|v| BoundArgs::positive_int(v, "dimension"))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Operation::Dim { dims })
        },
    },
    OperationSpec {
        name: "SB",
        params: &["offset", "end", "power"],
        variadic: false,
        about: "Sine-bell apodization",
        build: |args| {
            Ok(Operation::Sb {
                offset: args.number("offset", Some(0.5))?,
                end: args.number("end", Some(1.0))?,
                power: args.number("power", Some(2.0))?,
            })
        },
    },
    OperationSpec {
        name: "EXPD",
        params: &["lb"],
        variadic: false,
        about: "Exponential line broadening (Hz)",
        build: |args| Ok(Operation::Expd { lb: args.number("lb", Some(1.0))? }),
    },
    OperationSpec {
        name: "GM",
        params: &["g1", "g2", "g3"],
        variadic: false,
        about: "Lorentz-to-Gauss apodization",
        build: |args| {
            Ok(Operation::Gm {
                g1: args.number("g1", Some(1.0))?,
                g2: args.number("g2", Some(1.0))?,
                g3: args.number("g3", Some(0.0))?,
            })
        },
    },
    OperationSpec {
        name: "ZF",
        params: &["factor"],
        variadic: false,
        about: "Zero fill",
        build: |args| {
            let factor = match args.take("factor") {
                Some(v) => BoundArgs::positive_int(v, "'factor'")?,
                None => 1,
            };
            Ok(Operation::Zf { factor })
        },
    },
    OperationSpec {
        name: "FT",
        params: &[],
        variadic: false,
        about: "Fourier transform",
        build: |_| Ok(Operation::Ft),
    },
    OperationSpec {
        name: "PHASE",
        params: &["ph0", "ph1"],
        variadic: false,
        about: "Zero- and first-order phase correction (degrees)",
        build: |args| {
            Ok(Operation::Phase {
                ph0: args.number("ph0", Some(0.0))?,
                ph1: args.number("ph1", Some(0.0))?,
            })
        },
    },
    OperationSpec {
        name: "EXTRACT",
        params: &["start", "end", "mode"],
        variadic: false,
        about: "Keep a region of the spectrum",
        build: |args| {
            Ok(Operation::Extract {
                start: args.number("start", None)?,
                end: args.number("end", None)?,
                mode: args.string("mode", Some("fraction"))?,
            })
        },
    },
    OperationSpec {
        name: "REAL",
        params: &[],
        variadic: false,
        about: "Discard the imaginary part",
        build: |_| Ok(Operation::Real),
    },
    OperationSpec {
        name: "run",
        params: &[],
        variadic: false,
        about: "Execute the recipe",
        build: |_| Ok(Operation::Run),
    },
];

/// Mapping from operation name to constructor
#[derive(Clone, Debug)]
pub struct OperationRegistry {
    specs: BTreeMap<&'static str, OperationSpec>,
}

impl OperationRegistry {
    pub fn builtin() -> Result<Self, RecipeError> {
        Self::from_specs(BUILTIN_OPERATIONS.iter().cloned())
    }

    /// Build a registry, rejecting blank or duplicate names and repeated parameters
    pub fn from_specs(specs: impl IntoIterator<Item = OperationSpec>) -> Result<Self, RecipeError> {
        let mut registry = BTreeMap::new();

        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(RecipeError::InvalidRegistry("operation name is empty".into()));
            }
            let mut params = HashSet::new();
            if let Some(param) = spec.params.iter().find(|p| !params.insert(**p)) {
                return Err(RecipeError::InvalidRegistry(format!(
                    "operation '{}' lists parameter '{}' twice",
                    spec.name, param
                )));
            }
            let name = spec.name;
            if registry.insert(name, spec).is_some() {
                return Err(RecipeError::InvalidRegistry(format!(
                    "operation '{}' is registered more than once",
                    name
                )));
            }
        }

        Ok(Self { specs: registry })
    }

    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.specs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Look up the call's operation and construct it
    pub fn build(&self, call: &Call) -> Result<Step, RecipeError> {
        let spec = self
            .get(&call.name)
            .ok_or_else(|| RecipeError::UnknownOperation {
                line: call.line,
                name: call.name.clone(),
            })?;

        let argument_error = |reason: String| RecipeError::Argument {
            line: call.line,
            op: spec.name.to_string(),
            reason,
        };

        let args = spec.bind(call).map_err(argument_error)?;
        let op = (spec.build)(&args).map_err(argument_error)?;
        Ok(Step {
            op,
            extra: args.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, positional: Vec<Value>, keywords: Vec<(&str, Value)>) -> Call {
        Call {
            name: name.to_string(),
            positional,
            keywords: keywords
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            line: 1,
        }
    }

    #[test]
    fn test_registry_contents() {
        let registry = OperationRegistry::builtin().unwrap();
        for name in ["FID", "CREATE", "DIM", "SB", "ZF", "FT", "PHASE", "EXTRACT", "REAL", "run"] {
            assert!(registry.get(name).is_some(), "missing {}", name);
        }
        assert!(registry.get("ft").is_none());
        assert_eq!(registry.get("PHASE").unwrap().signature(), "PHASE(ph0, ph1)");
    }

    #[test]
    fn test_positional_and_keyword_binding() {
        let registry = OperationRegistry::builtin().unwrap();
        let op = registry
            .build(&call(
                "PHASE",
                vec![Value::Number(12.5)],
                vec![("ph1", Value::Number(-3.0))],
            ))
            .unwrap();
        assert_eq!(op, Step::new(Operation::Phase { ph0: 12.5, ph1: -3.0 }));
    }

    #[test]
    fn test_defaults() {
        let registry = OperationRegistry::builtin().unwrap();
        assert_eq!(
            registry.build(&call("SB", vec![], vec![])).unwrap().op,
            Operation::Sb { offset: 0.5, end: 1.0, power: 2.0 }
        );
        assert_eq!(
            registry.build(&call("ZF", vec![], vec![])).unwrap().op,
            Operation::Zf { factor: 1 }
        );
        assert_eq!(
            registry.build(&call("DIM", vec![], vec![])).unwrap().op,
            Operation::Dim { dims: vec![] }
        );
    }

    #[test]
    fn test_argument_errors() {
        let registry = OperationRegistry::builtin().unwrap();
        let cases = [
            call("FID", vec![], vec![]),
            call("FT", vec![Value::Number(1.0)], vec![]),
            call("PHASE", vec![Value::Number(1.0)], vec![("ph0", Value::Number(2.0))]),
            call(
                "PHASE",
                vec![],
                vec![("dimag", Value::Bool(true)), ("dimag", Value::Bool(false))],
            ),
            call("PHASE", vec![Value::Str("x".into())], vec![]),
            call("DIM", vec![Value::Number(0.0)], vec![]),
            call("DIM", vec![Value::Number(1.5)], vec![]),
            call("ZF", vec![Value::Number(-1.0)], vec![]),
            call("EXTRACT", vec![Value::Number(0.1)], vec![]),
            call("EXTRACT", vec![Value::Str("a".into()), Value::Number(0.5)], vec![]),
        ];
        for case in &cases {
            let err = registry.build(case).unwrap_err();
            assert!(
                matches!(err, RecipeError::Argument { .. }),
                "{}: {:?}",
                case.name,
                err
            );
        }
    }

    #[test]
    fn test_unknown_keywords_pass_through() {
        let registry = OperationRegistry::builtin().unwrap();

        let step = registry
            .build(&call(
                "PHASE",
                vec![Value::Number(10.0), Value::Number(0.0)],
                vec![("dimag", Value::Bool(false))],
            ))
            .unwrap();
        assert_eq!(step.op, Operation::Phase { ph0: 10.0, ph1: 0.0 });
        assert_eq!(step.extra.get("dimag"), Some(&Value::Bool(false)));
        assert_eq!(step.to_string(), "PHASE(ph0=10, ph1=0, dimag=False)");

        let step = registry
            .build(&call("ZF", vec![], vec![("size", Value::Number(4096.0))]))
            .unwrap();
        assert_eq!(step.op, Operation::Zf { factor: 1 });
        assert_eq!(step.to_string(), "ZF(factor=1, size=4096)");

        let step = registry
            .build(&call("FT", vec![], vec![("negate", Value::Bool(true))]))
            .unwrap();
        assert_eq!(step.to_string(), "FT(negate=True)");
    }

    #[test]
    fn test_extract_mode_left_to_engine() {
        let registry = OperationRegistry::builtin().unwrap();
        let step = registry
            .build(&call(
                "EXTRACT",
                vec![],
                vec![
                    ("start", Value::Number(0.1)),
                    ("end", Value::Number(0.6)),
                    ("mode", Value::Str("region".into())),
                ],
            ))
            .unwrap();
        assert_eq!(
            step.op,
            Operation::Extract { start: 0.1, end: 0.6, mode: "region".into() }
        );

        let step = registry
            .build(&call("EXTRACT", vec![Value::Number(120.0), Value::Number(4096.0)], vec![]))
            .unwrap();
        assert!(matches!(step.op, Operation::Extract { ref mode, .. } if mode == "fraction"));
    }

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = OperationRegistry::builtin().unwrap();
        assert_eq!(registry.len(), BUILTIN_OPERATIONS.len());
    }

    #[test]
    fn test_duplicate_operations_rejected() {
        let mut specs = BUILTIN_OPERATIONS.to_vec();
        specs.push(BUILTIN_OPERATIONS[0].clone());
        let err = OperationRegistry::from_specs(specs).unwrap_err();
        assert!(matches!(err, RecipeError::InvalidRegistry(ref msg) if msg.contains("FID")));

        let mut blank = BUILTIN_OPERATIONS[0].clone();
        blank.name = " ";
        assert!(OperationRegistry::from_specs([blank]).is_err());
    }

    #[test]
    fn test_unknown_operation() {
        let err = OperationRegistry::builtin().unwrap()
            .build(&call("LP", vec![], vec![]))
            .unwrap_err();
        assert!(matches!(err, RecipeError::UnknownOperation { ref name, .. } if name == "LP"));
    }

    #[test]
    fn test_canonical_display() {
        assert_eq!(Operation::Fid { path: "data/fid".into() }.to_string(), "FID('data/fid')");
        assert_eq!(Operation::Dim { dims: vec![1, 2] }.to_string(), "DIM(1, 2)");
        assert_eq!(Operation::Phase { ph0: 10.0, ph1: 0.5 }.to_string(), "PHASE(ph0=10, ph1=0.5)");
        assert_eq!(Operation::Run.to_string(), "run()");
    }
}

//! `build.toml` parsing
//!
//! ```toml
//! [project]
//! group = "org.example"
//! name = "app"
//! version = "1.0.0"
//! licenses = ["ApacheV2_0"]
//!
//! [workflow]
//! standard = true
//!
//! [dependencies.compile]
//! dependencies = ["org.example:lib:2.1.0"]
//!
//! [plugins.dependency]
//! id = "org.savantbuild.plugin:dependency:0.1.0"
//!
//! [targets.compile]
//! description = "Compiles the project"
//! run = ["make"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use serde::Deserialize;

use super::global::GlobalConfiguration;
use crate::domain::{
    Artifact, ArtifactId, Dependencies, DependencyGroup, License, Project, ProjectHandle, Publication, Target,
    Version, VersionMappings,
};
use crate::error::BuildError;
use crate::output::Output;
use crate::plugin::{PluginLoader, TypeRegistry};
use crate::runtime::RuntimeConfiguration;
use crate::workflow::{CacheProcess, MavenProcess, Process, ProcessError, SubversionProcess, UrlProcess, Workflow};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BuildFile {
    project: ProjectSection,

    workflow: Option<WorkflowSection>,

    #[serde(default)]
    dependencies: BTreeMap<String, GroupSection>,

    #[serde(default)]
    publications: Vec<PublicationSection>,

    #[serde(default)]
    plugins: BTreeMap<String, PluginSection>,

    #[serde(default)]
    targets: BTreeMap<String, TargetSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ProjectSection {
    group: String,
    name: String,
    version: Option<String>,

    #[serde(default)]
    licenses: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct WorkflowSection {
    #[serde(default)]
    standard: bool,

    #[serde(default)]
    fetch: Vec<ProcessSection>,

    #[serde(default)]
    publish: Vec<ProcessSection>,

    /// `group:project:version` -> semantic version
    #[serde(default)]
    mappings: BTreeMap<String, String>,

    #[serde(default)]
    range_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ProcessSection {
    Cache {
        dir: Option<PathBuf>,
    },
    Url {
        url: String,
        username: Option<String>,
        password: Option<String>,
    },
    Maven {
        url: String,
        username: Option<String>,
        password: Option<String>,
    },
    Subversion {
        repository: String,
        username: Option<String>,
        password: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct GroupSection {
    #[serde(default = "exported")]
    export: bool,

    #[serde(default)]
    dependencies: Vec<DependencySection>,
}

fn exported() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencySection {
    Spec(String),
    Detailed(DetailedDependency),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct DetailedDependency {
    id: String,

    #[serde(default)]
    skip_compatibility_check: bool,

    #[serde(default)]
    exclusions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PublicationSection {
    #[serde(default = "main_group")]
    group: String,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    file: Option<PathBuf>,
    source: Option<PathBuf>,
}

fn main_group() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSection {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TargetSection {
    description: Option<String>,

    #[serde(default)]
    depends_on: Vec<String>,

    /// Shell commands, run in order from the project directory
    #[serde(default)]
    run: Vec<String>,
}

/// Builds a [`Project`] from a build file
pub struct BuildFileParser {
    output: Rc<dyn Output>,
    runtime: Rc<RuntimeConfiguration>,
    global: Option<GlobalConfiguration>,
    registry: TypeRegistry,
}

impl BuildFileParser {
    pub fn new(output: Rc<dyn Output>, runtime: Rc<RuntimeConfiguration>) -> Self {
        Self {
            output,
            runtime,
            global: None,
            registry: TypeRegistry::builtin(),
        }
    }

    /// Uses `global` instead of loading `~/.savant/config.toml`
    pub fn with_global(mut self, global: GlobalConfiguration) -> Self {
        self.global = Some(global);
        self
    }

    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Parses the file, loads its plugins and builds the target graph
    pub fn parse(&self, build_file: &Path) -> Result<ProjectHandle, BuildError> {
        if !build_file.is_file() {
            return Err(BuildError::MissingBuildFile(build_file.to_path_buf()));
        }

        let io_error = |source| BuildError::Io {
            path: build_file.to_path_buf(),
            source,
        };
        let contents = fs::read_to_string(build_file).map_err(io_error)?;
        let directory = build_file
            .canonicalize()
            .map_err(io_error)?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let global = match &self.global {
            Some(global) => global.clone(),
            None => GlobalConfiguration::load()?,
        };

        tracing::debug!(file = %build_file.display(), "parsing build file");
        let file = read_build_file(&contents, build_file, &global)?;

        let mut project = Project::new(&directory, Rc::clone(&self.output));
        project.group = file.project.group;
        project.name = file.project.name;
        project.version = file.project.version.map(|v| v.parse::<Version>()).transpose()?;
        project.licenses = file.project.licenses.into_iter().map(License::new).collect();

        if let Some(workflow) = file.workflow {
            project.workflow = build_workflow(workflow, &directory, &global)?;
        }

        let mappings = project.workflow.mappings.clone();
        project.dependencies = build_dependencies(file.dependencies, &mappings)?;

        for section in file.publications {
            let (group, publication) = build_publication(&project, section)?;
            project.publications.add(group, publication);
        }

        let project = project.into_handle();
        self.load_plugins(&project, file.plugins, &mappings)?;

        {
            let mut project = project.borrow_mut();
            for (name, section) in file.targets {
                let target = shell_target(name, section, &directory, Rc::clone(&self.output));
                project.add_target(target);
            }
            project.build_target_graph()?;
        }

        Ok(project)
    }

    fn load_plugins(
        &self,
        project: &ProjectHandle,
        plugins: BTreeMap<String, PluginSection>,
        mappings: &VersionMappings,
    ) -> Result<(), BuildError> {
        if plugins.is_empty() {
            return Ok(());
        }

        let loader = PluginLoader::new(Rc::clone(project), Rc::clone(&self.runtime), Rc::clone(&self.output))
            .with_registry(self.registry.clone());

        for (name, section) in plugins {
            let id = section.id.ok_or_else(|| {
                BuildError::Parse(format!(
                    "Invalid plugin [{name}]. You must supply the id of the plugin to load like this:\n\n  \
                     [plugins.{name}]\n  id = \"org.savantbuild.plugin:{name}:0.1.0\""
                ))
            })?;
            let artifact = Artifact::parse_with_mappings(&id, mappings)?;
            loader.load(&name, &artifact)?;
        }

        Ok(())
    }
}

fn read_build_file(contents: &str, path: &Path, global: &GlobalConfiguration) -> Result<BuildFile, BuildError> {
    let invalid = |e: toml::de::Error| BuildError::Parse(format!("Invalid build file [{}]: {}", path.display(), e));

    let mut value: toml::Value = toml::from_str(contents).map_err(invalid)?;
    if value.get("global").is_some() {
        return Err(BuildError::BuildFailure(
            "You cannot set or change global configuration properties from a build file".into(),
        ));
    }

    substitute_globals(&mut value, global)?;
    value.try_into().map_err(invalid)
}

fn substitute_globals(value: &mut toml::Value, global: &GlobalConfiguration) -> Result<(), BuildError> {
    match value {
        toml::Value::String(text) => *text = global.substitute(text)?,
        toml::Value::Array(values) => {
            for value in values {
                substitute_globals(value, global)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, value) in table.iter_mut() {
                substitute_globals(value, global)?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn build_workflow(section: WorkflowSection, directory: &Path, global: &GlobalConfiguration) -> Result<Workflow, BuildError> {
    let mut workflow = if section.standard {
        Workflow::standard(global.cache_dir()).map_err(invalid_process)?
    } else {
        Workflow::default()
    };

    for process in section.fetch {
        workflow.fetch.processes.push(build_process(process, directory, global)?);
    }
    for process in section.publish {
        workflow.publish.processes.push(build_process(process, directory, global)?);
    }

    let mut mappings = VersionMappings::new();
    for (key, version) in section.mappings {
        mappings = mappings.map(key, version.parse()?);
    }
    for (key, version) in section.range_mappings {
        mappings = mappings.map_range(key, version);
    }

    Ok(workflow.with_mappings(mappings))
}

fn build_process(section: ProcessSection, directory: &Path, global: &GlobalConfiguration) -> Result<Process, BuildError> {
    let process = match section {
        ProcessSection::Cache { dir } => {
            let dir = dir.map(|dir| directory.join(dir)).unwrap_or_else(|| global.cache_dir());
            Process::Cache(CacheProcess::new(dir))
        }
        ProcessSection::Url { url, username, password } => {
            Process::Url(UrlProcess::new(&url, username, password).map_err(invalid_process)?)
        }
        ProcessSection::Maven { url, username, password } => {
            Process::Maven(MavenProcess::new(&url, username, password).map_err(invalid_process)?)
        }
        ProcessSection::Subversion {
            repository,
            username,
            password,
        } => Process::Subversion(SubversionProcess::new(repository, username, password)),
    };

    Ok(process)
}

fn invalid_process(error: ProcessError) -> BuildError {
    BuildError::Parse(format!("Invalid workflow process: {error}"))
}

fn build_dependencies(
    groups: BTreeMap<String, GroupSection>,
    mappings: &VersionMappings,
) -> Result<Dependencies, BuildError> {
    let mut dependencies = Dependencies::default();
    for (name, section) in groups {
        let mut artifacts = Vec::with_capacity(section.dependencies.len());
        for dependency in section.dependencies {
            let artifact = match dependency {
                DependencySection::Spec(spec) => Artifact::parse_with_mappings(&spec, mappings)?,
                DependencySection::Detailed(detailed) => {
                    let exclusions = detailed
                        .exclusions
                        .iter()
                        .map(|exclusion| exclusion.parse::<ArtifactId>())
                        .collect::<Result<Vec<_>, _>>()?;
                    let artifact = Artifact::parse_with_mappings(&detailed.id, mappings)?.with_exclusions(exclusions);
                    if detailed.skip_compatibility_check {
                        artifact.skip_compatibility_check()
                    } else {
                        artifact
                    }
                }
            };
            artifacts.push(artifact);
        }

        dependencies.add_group(DependencyGroup::new(name, section.export, artifacts));
    }

    Ok(dependencies)
}

fn build_publication(project: &Project, section: PublicationSection) -> Result<(String, Publication), BuildError> {
    let (Some(name), Some(kind), Some(file)) = (section.name, section.kind, section.file) else {
        return Err(BuildError::Parse(
            "Invalid publication definition. It must have the name, type and file attributes like this:\n\n  \
             [[publications]]\n  name = \"foo\"\n  type = \"jar\"\n  file = \"build/jars/foo.jar\"\n  \
             source = \"build/jars/foo-src.jar\""
                .into(),
        ));
    };

    let version = project.version.clone().ok_or_else(|| {
        BuildError::Parse(format!(
            "The publication [{name}] requires a project version. Set it like this:\n\n  [project]\n  version = \"1.0.0\""
        ))
    })?;

    let artifact = Artifact::new(ArtifactId::new(&project.group, &project.name, name, kind), version);
    let publication = Publication {
        artifact,
        metadata: project.metadata(),
        file: project.directory.join(file),
        source: section.source.map(|source| project.directory.join(source)),
    };

    Ok((section.group, publication))
}

fn shell_target(name: String, section: TargetSection, directory: &Path, output: Rc<dyn Output>) -> Target {
    let directory = directory.to_path_buf();
    let commands = section.run;
    let target = Target::new(name, move || run_commands(&commands, &directory, output.as_ref()))
        .depends_on(section.depends_on);

    match section.description {
        Some(description) => target.with_description(description),
        None => target,
    }
}

fn run_commands(commands: &[String], directory: &Path, output: &dyn Output) -> Result<(), BuildError> {
    for command in commands {
        output.debug(&format!("Running [{command}]"));
        let status = shell(command)
            .current_dir(directory)
            .status()
            .map_err(|e| BuildError::BuildFailure(format!("Unable to run [{command}]: {e}")))?;

        if !status.success() {
            return Err(BuildError::BuildFailure(format!("The command [{command}] failed ({status})")));
        }
    }

    Ok(())
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut shell = Command::new("sh");
    shell.arg("-c").arg(command);
    shell
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut shell = Command::new("cmd");
    shell.arg("/C").arg(command);
    shell
}

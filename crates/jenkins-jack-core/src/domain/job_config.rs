//! Streaming patches over a job's `config.xml`.
//!
//! Documents are rewritten event by event: every node the patch does not
//! target is written back from its original bytes, so unknown plugin
//! configuration survives untouched.

use jenkins_jack_api::{
    JackError,
    JackResult,
};
use quick_xml::events::{
    BytesEnd,
    BytesStart,
    BytesText,
    Event,
};
use quick_xml::{
    Reader,
    Writer,
};

const ROOT: &str = "flow-definition";
const DEFINITION: &str = "definition";
const SCRIPT: &str = "script";
const SANDBOX: &str = "sandbox";
const QUIET_PERIOD: &str = "quietPeriod";

pub const INLINE_DEFINITION_CLASS: &str = "org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition";

/// Baseline document for jobs created from a local script
pub const PIPELINE_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<flow-definition plugin="workflow-job@2.10">
    <description />
    <keepDependencies>false</keepDependencies>
    <properties>
        <com.sonyericsson.rebuild.RebuildSettings plugin="rebuild@1.25">
            <autoRebuild>false</autoRebuild>
            <rebuildDisabled>false</rebuildDisabled>
        </com.sonyericsson.rebuild.RebuildSettings>
        <com.synopsys.arc.jenkinsci.plugins.jobrestrictions.jobs.JobRestrictionProperty plugin="job-restrictions@0.4" />
        <hudson.plugins.throttleconcurrents.ThrottleJobProperty plugin="throttle-concurrents@2.0">
            <categories class="java.util.concurrent.CopyOnWriteArrayList" />
            <throttleEnabled>false</throttleEnabled>
            <throttleOption>project</throttleOption>
            <limitOneJobWithMatchingParams>false</limitOneJobWithMatchingParams>
            <paramsToUseForLimit />
        </hudson.plugins.throttleconcurrents.ThrottleJobProperty>
        <org.jenkinsci.plugins.workflow.job.properties.PipelineTriggersJobProperty>
            <triggers />
        </org.jenkinsci.plugins.workflow.job.properties.PipelineTriggersJobProperty>
    </properties>
    <definition class="org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition" plugin="workflow-cps@2.29">
        <script></script>
        <sandbox>false</sandbox>
    </definition>
    <triggers />
</flow-definition>
"#;

/// Result of injecting a script into a configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedConfig {
    pub xml: String,
    /// Raw `<definition>` element that was swapped out because it loaded
    /// the pipeline from SCM. Write it back with [`restore_definition`].
    pub detached_definition: Option<String>,
}

fn parse_error(err: impl std::fmt::Display) -> JackError {
    JackError::Parse(format!("Invalid job configuration: {err}"))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> JackResult<()> {
    writer
        .write_event(event)
        .map_err(|e| JackError::Parse(format!("Failed to write job configuration: {e}")))
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn is_inline_definition(start: &BytesStart<'_>) -> bool {
    start
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"class")
        .map(|attr| String::from_utf8_lossy(&attr.value).ends_with("CpsFlowDefinition"))
        .unwrap_or(false)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> JackResult<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn write_inline_definition(writer: &mut Writer<Vec<u8>>, script: &str) -> JackResult<()> {
    emit(
        writer,
        Event::Start(
            BytesStart::new(DEFINITION).with_attributes([("class", INLINE_DEFINITION_CLASS)]),
        ),
    )?;
    write_text_element(writer, SCRIPT, script)?;
    write_text_element(writer, SANDBOX, "false")?;
    emit(writer, Event::End(BytesEnd::new(DEFINITION)))
}

fn write_quiet_period(writer: &mut Writer<Vec<u8>>) -> JackResult<()> {
    write_text_element(writer, QUIET_PERIOD, "0")
}

fn new_reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader
}

fn into_string(writer: Writer<Vec<u8>>) -> JackResult<String> {
    String::from_utf8(writer.into_inner()).map_err(parse_error)
}

/// Writes `script` into the inline pipeline definition and forces
/// `quietPeriod` to `0`. Missing nodes are added; an SCM-backed definition is
/// replaced by an inline one and handed back in the result.
pub fn patch_script(xml: &str, script: &str) -> JackResult<PatchedConfig> {
    let mut reader = new_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + script.len()));

    let mut path: Vec<String> = Vec::new();
    let mut saw_definition = false;
    let mut saw_quiet_period = false;
    let mut in_inline_definition = false;
    let mut script_written = false;
    let mut detached_definition = None;

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(parse_error)?;

        match event {
            Event::Eof => break,
            Event::Start(start) => {
                let name = element_name(&start);
                let depth = path.len();

                if depth == 0 && name != ROOT {
                    return Err(JackError::InvalidConfig(format!(
                        "Not a pipeline job configuration (root element <{name}>)"
                    )));
                }

                if depth == 1 && name == DEFINITION {
                    saw_definition = true;
                    if is_inline_definition(&start) {
                        in_inline_definition = true;
                    } else {
                        reader.read_to_end(start.name()).map_err(parse_error)?;
                        let end = reader.buffer_position() as usize;
                        detached_definition = Some(xml[position..end].to_string());
                        write_inline_definition(&mut writer, script)?;
                        continue;
                    }
                } else if depth == 1 && name == QUIET_PERIOD {
                    saw_quiet_period = true;
                    reader.read_to_end(start.name()).map_err(parse_error)?;
                    write_quiet_period(&mut writer)?;
                    continue;
                } else if depth == 2 && in_inline_definition && name == SCRIPT {
                    reader.read_to_end(start.name()).map_err(parse_error)?;
                    write_text_element(&mut writer, SCRIPT, script)?;
                    script_written = true;
                    continue;
                }

                path.push(name);
                emit(&mut writer, Event::Start(start))?;
            }
            Event::Empty(start) => {
                let name = element_name(&start);
                let depth = path.len();

                if depth == 0 {
                    if name != ROOT {
                        return Err(JackError::InvalidConfig(format!(
                            "Not a pipeline job configuration (root element <{name}>)"
                        )));
                    }
                    // `<flow-definition/>`: open it up and fill in both nodes
                    emit(&mut writer, Event::Start(start))?;
                    emit(&mut writer, Event::Text(BytesText::new("\n  ")))?;
                    write_inline_definition(&mut writer, script)?;
                    emit(&mut writer, Event::Text(BytesText::new("\n  ")))?;
                    write_quiet_period(&mut writer)?;
                    emit(&mut writer, Event::Text(BytesText::new("\n")))?;
                    emit(&mut writer, Event::End(BytesEnd::new(ROOT)))?;
                    continue;
                }

                if depth == 1 && name == DEFINITION {
                    saw_definition = true;
                    if !is_inline_definition(&start) {
                        let end = reader.buffer_position() as usize;
                        detached_definition = Some(xml[position..end].to_string());
                    }
                    write_inline_definition(&mut writer, script)?;
                } else if depth == 1 && name == QUIET_PERIOD {
                    saw_quiet_period = true;
                    write_quiet_period(&mut writer)?;
                } else if depth == 2 && in_inline_definition && name == SCRIPT {
                    write_text_element(&mut writer, SCRIPT, script)?;
                    script_written = true;
                } else {
                    emit(&mut writer, Event::Empty(start))?;
                }
            }
            Event::End(end) => {
                match path.len() {
                    2 if in_inline_definition => {
                        if !script_written {
                            write_text_element(&mut writer, SCRIPT, script)?;
                        }
                        in_inline_definition = false;
                    }
                    1 => {
                        if !saw_definition {
                            write_inline_definition(&mut writer, script)?;
                        }
                        if !saw_quiet_period {
                            emit(&mut writer, Event::Text(BytesText::new("  ")))?;
                            write_quiet_period(&mut writer)?;
                            emit(&mut writer, Event::Text(BytesText::new("\n")))?;
                        }
                    }
                    _ => {}
                }
                path.pop();
                emit(&mut writer, Event::End(end))?;
            }
            other => emit(&mut writer, other)?,
        }
    }

    if !path.is_empty() {
        return Err(JackError::Parse(
            "Invalid job configuration: unexpected end of document".to_string(),
        ));
    }

    Ok(PatchedConfig {
        xml: into_string(writer)?,
        detached_definition,
    })
}

/// Puts a previously detached `<definition>` back in place of the current one.
pub fn restore_definition(xml: &str, definition: &str) -> JackResult<String> {
    let mut reader = new_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + definition.len()));
    let mut depth = 0usize;
    let mut restored = false;

    loop {
        let event = reader.read_event().map_err(parse_error)?;

        match event {
            Event::Eof => break,
            Event::Start(start) => {
                if depth == 1 && start.name().as_ref() == DEFINITION.as_bytes() {
                    reader.read_to_end(start.name()).map_err(parse_error)?;
                    writer.get_mut().extend_from_slice(definition.as_bytes());
                    restored = true;
                    continue;
                }
                depth += 1;
                emit(&mut writer, Event::Start(start))?;
            }
            Event::Empty(start) => {
                if depth == 1 && start.name().as_ref() == DEFINITION.as_bytes() {
                    writer.get_mut().extend_from_slice(definition.as_bytes());
                    restored = true;
                } else {
                    emit(&mut writer, Event::Empty(start))?;
                }
            }
            Event::End(end) => {
                if depth == 1 && !restored {
                    writer.get_mut().extend_from_slice(definition.as_bytes());
                    restored = true;
                }
                depth = depth.saturating_sub(1);
                emit(&mut writer, Event::End(end))?;
            }
            other => emit(&mut writer, other)?,
        }
    }

    into_string(writer)
}

/// Text of `flow-definition/definition/script`, unescaped
#[cfg(test)]
pub(crate) fn read_script(xml: &str) -> JackResult<Option<String>> {
    let mut reader = new_reader(xml);
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut script: Option<String> = None;

    loop {
        match reader.read_event().map_err(parse_error)? {
            Event::Eof => return Ok(script),
            Event::Start(start) => path.push(start.name().as_ref().to_vec()),
            Event::End(_) => {
                if path.len() == 3
                    && path[1] == DEFINITION.as_bytes()
                    && path[2] == SCRIPT.as_bytes()
                {
                    return Ok(Some(script.unwrap_or_default()));
                }
                path.pop();
            }
            Event::Text(text)
                if path.len() == 3
                    && path[1] == DEFINITION.as_bytes()
                    && path[2] == SCRIPT.as_bytes() =>
            {
                let text = text.unescape().map_err(parse_error)?;
                script.get_or_insert_with(String::new).push_str(&text);
            }
            Event::CData(data)
                if path.len() == 3
                    && path[1] == DEFINITION.as_bytes()
                    && path[2] == SCRIPT.as_bytes() =>
            {
                script
                    .get_or_insert_with(String::new)
                    .push_str(&String::from_utf8_lossy(&data));
            }
            _ => {}
        }
    }
}

use compressed_view::host::EditorHost;
use compressed_view::{
    BufferId, Codec, CodecEntry, CodecKind, LifecycleController, Membership, MemoryEditor,
    OpenOutcome, Preferences, SaveOutcome, Session, TextEncoding, ViewerError,
};
use std::path::Path;

fn pack(kind: CodecKind, bytes: &[u8]) -> Vec<u8> {
    Codec::with_defaults(kind).compress_bytes(bytes).unwrap()
}

fn unpack(kind: CodecKind, bytes: &[u8]) -> Vec<u8> {
    Codec::with_defaults(kind).decompress_bytes(bytes).unwrap()
}

fn session_with(files: &[(&str, Vec<u8>)], prefs: Preferences) -> Session {
    let mut editor = MemoryEditor::new();
    for (path, bytes) in files {
        editor.write_file(*path, bytes.clone());
    }
    Session::with_editor(editor, prefs)
}

fn disk(session: &Session, path: &str) -> Vec<u8> {
    session.editor().file(Path::new(path)).unwrap().to_vec()
}

#[test]
fn test_open_gzip_hello() {
    let prefs = Preferences {
        codecs: vec![
            CodecEntry::new(Codec::with_defaults(CodecKind::Gzip)),
            CodecEntry::new(Codec::with_defaults(CodecKind::Bzip2)),
        ],
        ..Preferences::default()
    };
    let mut session = session_with(&[("log.gz", pack(CodecKind::Gzip, b"hello\n"))], prefs);

    let id = session.open("log.gz").unwrap();
    let registry = session.controller().registry();

    assert_eq!(session.editor().content(id), b"hello\n");
    assert_eq!(registry.membership(id), Membership::Included);
    assert_eq!(registry.codec(id), Some(CodecKind::Gzip));
    assert_eq!(registry.encoding(id), Some(TextEncoding::Utf8));
    assert_eq!(session.editor().status_text(), Some("gzip/UTF-8"));
}

#[test]
fn test_edit_and_save_recompresses() {
    let mut session = session_with(
        &[("log.gz", pack(CodecKind::Gzip, b"hello\n"))],
        Preferences::default(),
    );
    let id = session.open("log.gz").unwrap();

    session.editor_mut().type_text(id, "hello world\n");
    session.editor_mut().set_caret(id, 5);
    assert_eq!(session.save(id).unwrap(), 1);

    assert_eq!(unpack(CodecKind::Gzip, &disk(&session, "log.gz")), b"hello world\n");
    let editor = session.editor();
    assert_eq!(editor.content(id), b"hello world\n");
    assert_eq!(editor.caret(id), 5);
    assert!(!editor.is_dirty(id));
    assert_eq!(editor.undo_depth(id), 0);
}

#[test]
fn test_save_restores_original_encoding() {
    let original = TextEncoding::Utf16Le.encode("第一行\nline two\n").unwrap();
    let mut session = session_with(
        &[("notes.zst", pack(CodecKind::Zstd, &original))],
        Preferences::default(),
    );
    let id = session.open("notes.zst").unwrap();
    assert_eq!(session.editor().content(id), "第一行\nline two\n".as_bytes());
    assert_eq!(session.activate(id).text(), "zstd/UTF-16LE BOM");

    session.save(id).unwrap();
    assert_eq!(unpack(CodecKind::Zstd, &disk(&session, "notes.zst")), original);
}

#[test]
fn test_empty_file_open() {
    let mut session = session_with(&[("empty.bz2", Vec::new())], Preferences::default());
    let id = session.open("empty.bz2").unwrap();

    assert!(session.editor().content(id).is_empty());
    assert_eq!(session.controller().registry().codec(id), Some(CodecKind::Bzip2));

    session.editor_mut().type_text(id, "first line\n");
    session.save(id).unwrap();
    assert_eq!(unpack(CodecKind::Bzip2, &disk(&session, "empty.bz2")), b"first line\n");
}

#[test]
fn test_exclude_after_suffix_match_failure() {
    let mut session = session_with(
        &[("broken.gz", b"definitely not gzip".to_vec())],
        Preferences::default(),
    );
    let id = session.open("broken.gz").unwrap();
    let registry = session.controller().registry();

    assert_eq!(registry.membership(id), Membership::Excluded);
    assert_eq!(registry.stored_path(id), Some(Path::new("broken.gz")));
    assert!(registry.codec(id).is_none());
    assert!(registry.encoding(id).is_none());
    assert_eq!(session.editor().content(id), b"definitely not gzip");

    // 纯文本原样保存
    session.save(id).unwrap();
    assert_eq!(disk(&session, "broken.gz"), b"definitely not gzip");
}

#[test]
fn test_try_all_codecs() {
    let files = [
        ("data.bin", pack(CodecKind::Zstd, b"zstd inside")),
        ("wrong.gz", pack(CodecKind::Xz, b"xz inside")),
    ];

    let mut session = session_with(&files, Preferences::default());
    let plain = session.open("data.bin").unwrap();
    let wrong = session.open("wrong.gz").unwrap();
    assert_eq!(session.controller().registry().membership(plain), Membership::Untracked);
    assert_eq!(session.controller().registry().membership(wrong), Membership::Excluded);

    let prefs = Preferences {
        decompress_all: true,
        ..Preferences::default()
    };
    let mut session = session_with(&files, prefs);
    let plain = session.open("data.bin").unwrap();
    let wrong = session.open("wrong.gz").unwrap();
    assert_eq!(session.controller().registry().codec(plain), Some(CodecKind::Zstd));
    assert_eq!(session.controller().registry().codec(wrong), Some(CodecKind::Xz));
    assert_eq!(session.editor().content(wrong), b"xz inside");
}

#[test]
fn test_try_all_leaves_plain_text_untracked() {
    let notes = b"3  is just some plain text notes\n".to_vec();
    let prefs = Preferences {
        decompress_all: true,
        ..Preferences::default()
    };
    let mut session = session_with(&[("notes.txt", notes.clone())], prefs);

    let id = session.open("notes.txt").unwrap();
    assert_eq!(session.controller().registry().membership(id), Membership::Untracked);
    assert_eq!(session.editor().content(id), notes.as_slice());

    session.save(id).unwrap();
    assert_eq!(disk(&session, "notes.txt"), notes);
}

#[test]
fn test_toggle_scenario() {
    let mut session = session_with(&[("notes.txt", b"my notes\n".to_vec())], Preferences::default());
    let id = session.open("notes.txt").unwrap();
    assert_eq!(session.controller().registry().membership(id), Membership::Untracked);

    session.toggle(id, CodecKind::Bzip2).unwrap();
    assert_eq!(unpack(CodecKind::Bzip2, session.editor().content(id)), b"my notes\n");
    assert_eq!(session.controller().registry().codec(id), Some(CodecKind::Bzip2));

    session.toggle(id, CodecKind::Bzip2).unwrap();
    assert_eq!(session.editor().content(id), b"my notes\n");
    assert_eq!(session.controller().registry().membership(id), Membership::Excluded);

    session.save(id).unwrap();
    assert_eq!(disk(&session, "notes.txt"), b"my notes\n");
}

#[test]
fn test_toggled_buffer_saves_compressed_bytes() {
    let mut session = session_with(&[("notes.txt", b"keep me\n".to_vec())], Preferences::default());
    let id = session.open("notes.txt").unwrap();
    session.toggle(id, CodecKind::Gzip).unwrap();

    assert_eq!(session.save(id).unwrap(), 1);
    assert_eq!(unpack(CodecKind::Gzip, &disk(&session, "notes.txt")), b"keep me\n");
    assert_eq!(session.controller().registry().codec(id), Some(CodecKind::Gzip));
    assert!(!session.editor().is_dirty(id));
}

#[test]
fn test_rename_to_other_suffix_class_selects_new_codec() {
    let mut session = session_with(&[("f.txt", b"body\n".to_vec())], Preferences::default());
    let id = session.open("f.txt").unwrap();
    session.toggle(id, CodecKind::Bzip2).unwrap();

    // 第一次保存后发现目标算法变化，自动再保存一次
    assert_eq!(session.save_as(id, "f.gz").unwrap(), 2);

    assert_eq!(unpack(CodecKind::Gzip, &disk(&session, "f.gz")), b"body\n");
    let registry = session.controller().registry();
    assert_eq!(registry.codec(id), Some(CodecKind::Gzip));
    assert_eq!(registry.stored_path(id), Some(Path::new("f.gz")));
    assert_eq!(session.editor().content(id), b"body\n");
    assert!(!session.editor().is_dirty(id));
}

#[test]
fn test_rename_to_plain_suffix_writes_plain_text() {
    let original = TextEncoding::Utf8Bom.encode("text\n").unwrap();
    let mut session = session_with(
        &[("a.gz", pack(CodecKind::Gzip, &original))],
        Preferences::default(),
    );
    let id = session.open("a.gz").unwrap();

    assert_eq!(session.save_as(id, "a.txt").unwrap(), 2);
    assert_eq!(disk(&session, "a.txt"), original);
    assert_eq!(session.controller().registry().membership(id), Membership::Excluded);
    assert_eq!(session.editor().content(id), b"text\n");
}

#[test]
fn test_rename_within_suffix_class_keeps_decision() {
    let mut session = session_with(&[("a.txt", b"abc".to_vec())], Preferences::default());
    let id = session.open("a.txt").unwrap();
    session.toggle(id, CodecKind::Xz).unwrap();

    assert_eq!(session.save_as(id, "b.txt").unwrap(), 1);
    assert_eq!(unpack(CodecKind::Xz, &disk(&session, "b.txt")), b"abc");
    assert_eq!(session.controller().registry().codec(id), Some(CodecKind::Xz));
}

#[test]
fn test_new_file_saved_with_codec_suffix() {
    let mut session = Session::new(Preferences::default());
    let id = session.open("draft.txt").unwrap();
    session.editor_mut().type_text(id, "draft\n");

    // 后缀匹配的新文件第一次保存就写入压缩数据
    assert_eq!(session.save_as(id, "draft.gz").unwrap(), 1);
    assert_eq!(unpack(CodecKind::Gzip, &disk(&session, "draft.gz")), b"draft\n");
    assert_eq!(session.controller().registry().codec(id), Some(CodecKind::Gzip));
    assert_eq!(session.editor().content(id), b"draft\n");
    assert!(!session.editor().is_dirty(id));

    let id = session.open("draft2.txt").unwrap();
    session.editor_mut().type_text(id, "draft\n");
    assert_eq!(session.save_as(id, "draft.zst").unwrap(), 1);
    assert_eq!(unpack(CodecKind::Zstd, &disk(&session, "draft.zst")), b"draft\n");
}

#[test]
fn test_new_file_keeps_host_encoding() {
    let mut session = Session::new(Preferences::default());
    let id = session.open("wide.txt").unwrap();
    session.editor_mut().set_buffer_encoding(id, TextEncoding::Utf16Be);
    session.editor_mut().type_text(id, "宽字符\n");

    assert_eq!(session.save_as(id, "wide.xz").unwrap(), 1);
    let stored = unpack(CodecKind::Xz, &disk(&session, "wide.xz"));
    assert_eq!(stored, TextEncoding::Utf16Be.encode("宽字符\n").unwrap());
    assert_eq!(session.activate(id).text(), "xz/UTF-16BE BOM");
}

#[test]
fn test_file_saved_is_idempotent() {
    let mut editor = MemoryEditor::new();
    editor.write_file("a.gz", pack(CodecKind::Gzip, b"abc"));
    let id = editor.open_document("a.gz");
    let mut controller = LifecycleController::new(Preferences::default());
    controller.on_open(&mut editor, id).unwrap();

    controller.on_before_save(&mut editor, id).unwrap();
    editor.write_to_disk(id);
    assert_eq!(controller.on_file_saved(&mut editor, id).unwrap(), SaveOutcome::Restored);
    let membership = controller.registry().membership(id);
    let codec = controller.registry().codec(id);

    assert_eq!(controller.on_file_saved(&mut editor, id).unwrap(), SaveOutcome::Unchanged);
    assert_eq!(controller.registry().membership(id), membership);
    assert_eq!(controller.registry().codec(id), codec);
    assert_eq!(editor.take_save_request(), None);
    assert_eq!(editor.content(id), b"abc");
}

#[test]
fn test_corrective_save_happens_once() {
    let mut editor = MemoryEditor::new();
    let id = editor.open_document("f.txt");
    editor.type_text(id, "body");
    let mut controller = LifecycleController::new(Preferences::default());
    controller.on_open(&mut editor, id).unwrap();
    controller.toggle_compression(&mut editor, id, CodecKind::Bzip2).unwrap();

    editor.set_path(id, "f.gz");
    controller.on_before_save(&mut editor, id).unwrap();
    editor.write_to_disk(id);
    assert_eq!(
        controller.on_file_saved(&mut editor, id).unwrap(),
        SaveOutcome::Resaved { target: Some(CodecKind::Gzip) }
    );
    assert_eq!(editor.take_save_request(), Some(id));

    // 纠正性保存之前路径再次改变
    editor.set_path(id, "f.xz");
    controller.on_before_save(&mut editor, id).unwrap();
    assert!(controller.save_transaction(id).unwrap().corrective);
    editor.write_to_disk(id);
    assert_eq!(controller.on_file_saved(&mut editor, id).unwrap(), SaveOutcome::Abandoned);
    assert_eq!(editor.take_save_request(), None);
    assert_eq!(editor.content(id), b"body");
}

#[test]
fn test_manual_decompress_then_save() {
    let mut session = session_with(
        &[("blob.dat", pack(CodecKind::Gzip, b"hidden text"))],
        Preferences::default(),
    );
    let id = session.open("blob.dat").unwrap();
    assert_eq!(session.controller().registry().membership(id), Membership::Untracked);

    assert_eq!(session.decompress(id, CodecKind::Gzip).unwrap(), TextEncoding::Utf8);
    assert_eq!(session.editor().content(id), b"hidden text");

    session.save(id).unwrap();
    assert_eq!(unpack(CodecKind::Gzip, &disk(&session, "blob.dat")), b"hidden text");
}

#[test]
fn test_manual_compress_saves_verbatim() {
    let mut session = session_with(&[("plain.txt", b"payload".to_vec())], Preferences::default());
    let id = session.open("plain.txt").unwrap();

    session.compress(id, CodecKind::Brotli).unwrap();
    assert_eq!(session.controller().registry().membership(id), Membership::Excluded);

    session.save(id).unwrap();
    assert_eq!(unpack(CodecKind::Brotli, &disk(&session, "plain.txt")), b"payload");
}

#[test]
fn test_unknown_codec_name_is_reported() {
    let prefs = Preferences::default();
    assert!(matches!(prefs.codec_by_name("lzma"), Err(ViewerError::UnknownCodec(_))));
}

#[test]
fn test_open_with_bad_text_fails_and_closes() {
    let bad = pack(CodecKind::Gzip, &[0xFE, 0xFF, 0xD8, 0x00]);
    let mut session = session_with(&[("bad.gz", bad)], Preferences::default());

    let err = session.open("bad.gz").unwrap_err();
    assert!(matches!(err, ViewerError::EncodingConversion { .. }));
    assert_eq!(session.editor().document_count(), 0);
}

#[test]
fn test_close_removes_record() {
    let mut session = session_with(
        &[("log.gz", pack(CodecKind::Gzip, b"x"))],
        Preferences::default(),
    );
    let id = session.open("log.gz").unwrap();
    session.close(id);

    assert_eq!(session.controller().registry().membership(id), Membership::Untracked);
    assert!(session.controller().registry().is_empty());
    assert!(session.controller().save_transaction(id).is_none());
}

#[test]
fn test_buffers_are_independent() {
    let mut session = session_with(
        &[
            ("a.gz", pack(CodecKind::Gzip, b"a")),
            ("b.xz", pack(CodecKind::Xz, b"b")),
        ],
        Preferences::default(),
    );
    let a = session.open("a.gz").unwrap();
    let b = session.open("b.xz").unwrap();
    assert_ne!(a, b);

    session.close(a);
    assert_eq!(session.controller().registry().codec(b), Some(CodecKind::Xz));
    assert_eq!(session.controller().registry().codec(BufferId(999)), None);
}

#[test]
fn test_open_reports_outcome() {
    let mut editor = MemoryEditor::new();
    editor.write_file("x.br", pack(CodecKind::Brotli, b"brotli"));
    let id = editor.open_document("x.br");
    let mut controller = LifecycleController::new(Preferences::default());

    assert_eq!(
        controller.on_open(&mut editor, id).unwrap(),
        OpenOutcome::Included(CodecKind::Brotli)
    );
    assert_eq!(editor.raw_bytes(id), b"brotli");
}
